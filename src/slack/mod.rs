//! Slack 集成
//!
//! - `event`: 入站事件负载与分类
//! - `mention`: 提及检测、删除和追加
//! - `history`: 线程历史到对话的转换
//! - `client`: Web API 客户端，实现 `MessageSink` 和 `ThreadHistory`

pub mod client;
pub mod error;
pub mod event;
pub mod history;
pub mod mention;

pub use client::SlackClient;
pub use error::SlackError;
pub use event::{SlackEvent, SlackEventData};
pub use history::{build_conversation, ThreadHistory, ThreadMessage};
pub use mention::{is_bot_mentioned, strip_mentions, with_mention};
