//! 单元测试用的 sink 实现

use crate::streaming::traits::{MessageRef, MessageSink, SinkError};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpdate {
    pub message: MessageRef,
    pub text: String,
    pub mention: Option<String>,
}

/// 记录所有调用的 sink，可配置在第 N 次 update 之后失败
#[derive(Debug, Default)]
pub struct RecordingSink {
    posts: Mutex<Vec<(String, String, String)>>,
    updates: Mutex<Vec<RecordedUpdate>>,
    fail_after: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(successful_updates: usize) -> Self {
        Self {
            fail_after: Some(successful_updates),
            ..Self::default()
        }
    }

    pub fn posts(&self) -> Vec<(String, String, String)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn post(
        &self,
        channel: &str,
        placeholder: &str,
        thread_ts: &str,
    ) -> Result<MessageRef, SinkError> {
        self.posts.lock().unwrap().push((
            channel.to_string(),
            placeholder.to_string(),
            thread_ts.to_string(),
        ));
        Ok(MessageRef::new(channel, "1700000000.000200"))
    }

    async fn update(
        &self,
        message: &MessageRef,
        text: &str,
        mention: Option<&str>,
    ) -> Result<(), SinkError> {
        let mut updates = self.updates.lock().unwrap();
        if self.fail_after.is_some_and(|n| updates.len() >= n) {
            return Err(SinkError("msg_too_long".to_string()));
        }
        updates.push(RecordedUpdate {
            message: message.clone(),
            text: text.to_string(),
            mention: mention.map(str::to_string),
        });
        Ok(())
    }
}
