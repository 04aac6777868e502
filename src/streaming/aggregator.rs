//! 流式聚合器
//!
//! 单个控制循环：读取 chunk → 解析行 → 累积增量 → 节流发布，直到
//! 看到结束标记（Done）或出现读取/发布错误（Failed）。
//!
//! Failed 时直接返回错误，不会发出 finalize；此前成功的进行中发布
//! 仍然是 sink 上可见的最后状态。

use crate::streaming::accumulator::DeltaAccumulator;
use crate::streaming::error::StreamError;
use crate::streaming::metrics::StreamMetrics;
use crate::streaming::parser::{EventLineParser, StreamRecord};
use crate::streaming::reader::{ChunkRead, ChunkReader, DEFAULT_CHUNK_SIZE};
use crate::streaming::throttle::{PublishDecision, PublishThrottler};
use crate::streaming::traits::{MessageRef, MessageSink, StreamResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

// ============================================================================
// 配置
// ============================================================================

/// 流式配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// 单次读取上限（字节）
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// 两次进行中发布之间的最小间隔（毫秒）
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,

    /// 整体超时（毫秒），0 表示不限制
    #[serde(default)]
    pub timeout_ms: u64,

    /// 开始流式之前发布的占位文本
    #[serde(default = "default_placeholder_text")]
    pub placeholder_text: String,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_publish_interval_ms() -> u64 {
    3_000
}

fn default_placeholder_text() -> String {
    "...".to_string()
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            publish_interval_ms: default_publish_interval_ms(),
            timeout_ms: 0,
            placeholder_text: default_placeholder_text(),
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_publish_interval_ms(mut self, interval_ms: u64) -> Self {
        self.publish_interval_ms = interval_ms;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_placeholder_text(mut self, text: impl Into<String>) -> Self {
        self.placeholder_text = text.into();
        self
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }

    /// 整体超时；`timeout_ms == 0` 时为 `None`
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

// ============================================================================
// 聚合器
// ============================================================================

/// 聚合成功的结果
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    /// 完整回答（不含提及后缀）
    pub answer: String,
    pub metrics: StreamMetrics,
}

/// 一次聚合的可变状态，只属于当前调用
///
/// 回答由累积器追加；上次发布时间由节流器读取和重置。
struct AggregateState {
    parser: EventLineParser,
    accumulator: DeltaAccumulator,
    throttler: PublishThrottler,
    metrics: StreamMetrics,
}

impl AggregateState {
    fn new(interval: Duration, started_at: Instant) -> Self {
        Self {
            parser: EventLineParser::new(),
            accumulator: DeltaAccumulator::new(),
            throttler: PublishThrottler::new(interval, started_at),
            metrics: StreamMetrics::new(),
        }
    }

    /// 吸收一批记录，遇到结束标记时返回 true
    fn absorb(&mut self, records: &[StreamRecord]) -> bool {
        for record in records {
            let appended = self.accumulator.apply(record);
            self.metrics.record_record(appended);
            if *record == StreamRecord::Terminal {
                return true;
            }
        }
        false
    }

    fn close_metrics(&mut self) {
        self.metrics.parse_error_count = self.parser.malformed_count();
        self.metrics.publish_count = self.throttler.publish_count();
        self.metrics.throttled_count = self.throttler.throttled_count();
        self.metrics.answer_len = self.accumulator.len();
        self.metrics.finish();
    }
}

/// 流式聚合器
///
/// 把一个 Provider 响应流聚合成一条不断更新的消息。
pub struct StreamAggregator<'a> {
    sink: &'a dyn MessageSink,
    message: MessageRef,
    config: StreamConfig,
    /// 最终消息要提及的请求者
    mention: Option<String>,
    invocation_id: String,
}

impl<'a> StreamAggregator<'a> {
    pub fn new(sink: &'a dyn MessageSink, message: MessageRef, config: StreamConfig) -> Self {
        Self {
            sink,
            message,
            config,
            mention: None,
            invocation_id: String::new(),
        }
    }

    /// 设置请求者，空字符串表示未知
    pub fn with_mention(mut self, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        self.mention = (!user_id.is_empty()).then_some(user_id);
        self
    }

    pub fn with_invocation_id(mut self, invocation_id: impl Into<String>) -> Self {
        self.invocation_id = invocation_id.into();
        self
    }

    /// 消费响应流直到完成或失败
    ///
    /// 响应流在返回前一定被 drop，无论哪条退出路径。
    pub async fn run(&self, source: StreamResponse) -> Result<AggregateOutcome, StreamError> {
        let reader = ChunkReader::new(source, self.config.chunk_size);
        let mut state = AggregateState::new(self.config.publish_interval(), Instant::now());

        let result = match self.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, self.drive(reader, &mut state))
                .await
                .unwrap_or(Err(StreamError::Timeout)),
            None => self.drive(reader, &mut state).await,
        };

        state.close_metrics();
        state.metrics.log_metrics(&self.invocation_id);

        match result {
            Ok(()) => Ok(AggregateOutcome {
                answer: state.accumulator.into_answer(),
                metrics: state.metrics,
            }),
            Err(err) => {
                error!(
                    invocation_id = %self.invocation_id,
                    error = %err,
                    error_type = err.error_type(),
                    answer_len = state.accumulator.len(),
                    "[AGGREGATOR] 流式聚合失败"
                );
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        mut reader: ChunkReader,
        state: &mut AggregateState,
    ) -> Result<(), StreamError> {
        loop {
            let chunk = match reader.next_chunk().await? {
                ChunkRead::Chunk(bytes) => bytes,
                ChunkRead::EndOfStream => {
                    let tail = state.parser.finish();
                    if state.absorb(&tail) {
                        return self.finalize(state).await;
                    }
                    warn!(
                        invocation_id = %self.invocation_id,
                        answer_len = state.accumulator.len(),
                        "[AGGREGATOR] 响应体在 [DONE] 之前结束"
                    );
                    return Err(StreamError::Truncated);
                }
            };

            state.metrics.record_chunk(chunk.len());
            let records = state.parser.feed(&chunk);
            if state.absorb(&records) {
                return self.finalize(state).await;
            }

            let decision = state
                .throttler
                .maybe_publish(
                    Instant::now(),
                    state.accumulator.answer(),
                    self.sink,
                    &self.message,
                )
                .await?;
            if decision == PublishDecision::Published {
                debug!(
                    invocation_id = %self.invocation_id,
                    chunk_count = state.metrics.chunk_count,
                    "[AGGREGATOR] 进行中的回答已更新"
                );
            }
        }
    }

    async fn finalize(&self, state: &mut AggregateState) -> Result<(), StreamError> {
        state
            .throttler
            .finalize(
                state.accumulator.answer(),
                self.sink,
                &self.message,
                self.mention.as_deref(),
            )
            .await
    }
}

// ============================================================================
// 测试模块
// ============================================================================
