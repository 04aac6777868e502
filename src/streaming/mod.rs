//! 流式聚合核心模块
//!
//! 消费 Provider 的 SSE 字节流，从增量中重建回答，并以受限频率把不断
//! 增长的回答重新发布到消息 sink，直到流结束。
//!
//! # 主要组件
//!
//! - `reader`: 定长 chunk 读取器
//! - `parser`: `data:` 行解析器，识别 `[DONE]` 结束标记
//! - `accumulator`: 增量文本累积器
//! - `throttle`: 发布节流器
//! - `aggregator`: 把以上组件串成单个控制循环
//! - `error` / `metrics` / `traits`: 错误、指标和外部接口

pub mod accumulator;
pub mod aggregator;
pub mod error;
pub mod metrics;
pub mod parser;
pub mod reader;
pub mod throttle;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出核心类型
pub use accumulator::{extract_delta, DeltaAccumulator};
pub use aggregator::{AggregateOutcome, StreamAggregator, StreamConfig};
pub use error::StreamError;
pub use metrics::StreamMetrics;
pub use parser::{parse_line, EventLineParser, StreamRecord, DATA_PREFIX, DONE_SENTINEL};
pub use reader::{ChunkRead, ChunkReader, DEFAULT_CHUNK_SIZE};
pub use throttle::{PublishDecision, PublishThrottler, DEFAULT_PUBLISH_INTERVAL};
pub use traits::{
    reqwest_stream_to_stream_response, MessageRef, MessageSink, SinkError, StreamResponse,
    StreamingProvider,
};
