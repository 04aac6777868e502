//! 线程历史与对话构建

use super::error::SlackError;
use super::mention::{is_bot_mentioned, strip_mentions};
use crate::models::openai::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 线程中的一条消息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ts: String,
}

/// 线程历史来源
#[async_trait]
pub trait ThreadHistory: Send + Sync {
    /// 按时间顺序返回 `ts` 所在线程的全部消息（包括根消息）
    async fn replies(&self, channel: &str, ts: &str) -> Result<Vec<ThreadMessage>, SlackError>;
}

/// 把线程历史转换成对话
///
/// bot 自己的消息作为 assistant；用户消息只保留提及了 bot 的；
/// 所有提及标记都会被删除。顺序保持不变。
pub fn build_conversation(bot_user_id: &str, messages: &[ThreadMessage]) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter_map(|msg| {
            let content = strip_mentions(&msg.text);
            if msg.user == bot_user_id {
                Some(ChatMessage::assistant(content))
            } else if is_bot_mentioned(&msg.text, bot_user_id) {
                Some(ChatMessage::user(content))
            } else {
                None
            }
        })
        .collect()
}
