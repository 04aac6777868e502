//! 入站事件
//!
//! 接收端把 Slack Events API 的 `app_mention` / `message` 事件压平成
//! `SlackEventData` 后转发过来；这里在边界上一次性分类成 `SlackEvent`。

use super::mention::is_bot_mentioned;
use serde::{Deserialize, Serialize};

pub const APP_MENTION_TYPE: &str = "app_mention";
pub const MESSAGE_TYPE: &str = "message";

/// 压平后的事件负载
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackEventData {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub time_stamp: String,
    /// 不在线程中时为空
    #[serde(default)]
    pub thread_time_stamp: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub message: String,
}

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlackEvent {
    AppMention,
    Message,
    Other,
}

impl SlackEvent {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            APP_MENTION_TYPE => SlackEvent::AppMention,
            MESSAGE_TYPE => SlackEvent::Message,
            _ => SlackEvent::Other,
        }
    }
}

impl SlackEventData {
    pub fn kind(&self) -> SlackEvent {
        SlackEvent::from_type(&self.event_type)
    }

    pub fn is_thread(&self) -> bool {
        !self.thread_time_stamp.is_empty()
    }

    /// 读取线程历史时使用的时间戳：线程根消息，不在线程中时为事件自身
    pub fn history_ts(&self) -> &str {
        if self.is_thread() {
            &self.thread_time_stamp
        } else {
            &self.time_stamp
        }
    }

    /// 是否需要回复
    ///
    /// `app_mention` 总是回复；`message` 只有提及 bot 时才回复；其他类型忽略。
    pub fn should_respond(&self, bot_user_id: &str) -> bool {
        match self.kind() {
            SlackEvent::AppMention => true,
            SlackEvent::Message => is_bot_mentioned(&self.message, bot_user_id),
            SlackEvent::Other => false,
        }
    }
}
