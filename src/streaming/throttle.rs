//! 发布节流器
//!
//! 每收到一个 chunk 评估一次：距上次发布超过间隔才会把当前完整回答推给 sink。
//! 没有独立定时器，所以发布延迟受 chunk 到达节奏约束。

use crate::streaming::error::StreamError;
use crate::streaming::traits::{MessageRef, MessageSink};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// 默认发布间隔（3 秒）
pub const DEFAULT_PUBLISH_INTERVAL: Duration = Duration::from_secs(3);

/// 一次节流评估的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishDecision {
    /// 已发布
    Published,
    /// 间隔未到
    Throttled,
    /// 自上次发布以来回答没有增长
    Unchanged,
}

/// 发布节流器
#[derive(Debug)]
pub struct PublishThrottler {
    interval: Duration,
    last_published_at: Instant,
    /// 上次发布时回答的长度
    published_len: usize,
    publish_count: u32,
    throttled_count: u32,
}

impl PublishThrottler {
    /// `started_at` 作为第一次间隔的起点
    pub fn new(interval: Duration, started_at: Instant) -> Self {
        Self {
            interval,
            last_published_at: started_at,
            published_len: 0,
            publish_count: 0,
            throttled_count: 0,
        }
    }

    /// 纯判断，不修改状态
    pub fn decide(&self, now: Instant, answer_len: usize) -> PublishDecision {
        if answer_len == self.published_len {
            PublishDecision::Unchanged
        } else if now.saturating_duration_since(self.last_published_at) >= self.interval {
            PublishDecision::Published
        } else {
            PublishDecision::Throttled
        }
    }

    /// 间隔已到且回答有增长时发布进行中的回答（不带提及）
    pub async fn maybe_publish(
        &mut self,
        now: Instant,
        answer: &str,
        sink: &dyn MessageSink,
        message: &MessageRef,
    ) -> Result<PublishDecision, StreamError> {
        let decision = self.decide(now, answer.len());
        match decision {
            PublishDecision::Published => {
                sink.update(message, answer, None)
                    .await
                    .map_err(|e| StreamError::publish(e.to_string()))?;
                self.last_published_at = now;
                self.published_len = answer.len();
                self.publish_count += 1;
                debug!(
                    ts = %message.ts,
                    answer_len = answer.len(),
                    "[THROTTLE] 已发布进行中的回答"
                );
            }
            PublishDecision::Throttled => self.throttled_count += 1,
            PublishDecision::Unchanged => {}
        }
        Ok(decision)
    }

    /// 无条件发布最终回答
    ///
    /// `mention` 为请求者的用户 ID，最终消息会提及请求者，进行中的更新不会。
    pub async fn finalize(
        &mut self,
        answer: &str,
        sink: &dyn MessageSink,
        message: &MessageRef,
        mention: Option<&str>,
    ) -> Result<(), StreamError> {
        sink.update(message, answer, mention)
            .await
            .map_err(|e| StreamError::publish(e.to_string()))?;
        self.published_len = answer.len();
        self.publish_count += 1;
        Ok(())
    }

    pub fn last_published_at(&self) -> Instant {
        self.last_published_at
    }

    /// 包含 finalize 在内的发布次数
    pub fn publish_count(&self) -> u32 {
        self.publish_count
    }

    pub fn throttled_count(&self) -> u32 {
        self.throttled_count
    }
}
