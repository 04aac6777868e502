//! 流式聚合指标
//!
//! 每次调用一份，结束时以一条结构化日志输出。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 流式聚合指标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMetrics {
    /// 首字节时间（毫秒），从聚合开始计算
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttfb_ms: Option<u64>,

    /// 读取到的 chunk 数量
    pub chunk_count: u32,

    /// 读取到的总字节数
    pub total_bytes: usize,

    /// 解析出的记录数量（含无法识别的行）
    pub record_count: u32,

    /// 贡献了文本的增量数量
    pub delta_count: u32,

    /// 解码失败的数据行数量
    pub parse_error_count: u32,

    /// 发布次数（含 finalize）
    pub publish_count: u32,

    /// 因间隔未到而跳过的发布次数
    pub throttled_count: u32,

    /// 最终回答长度（字节）
    pub answer_len: usize,

    pub start_time: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_chunk_time: Option<DateTime<Utc>>,
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self {
            ttfb_ms: None,
            chunk_count: 0,
            total_bytes: 0,
            record_count: 0,
            delta_count: 0,
            parse_error_count: 0,
            publish_count: 0,
            throttled_count: 0,
            answer_len: 0,
            start_time: Utc::now(),
            end_time: None,
            first_chunk_time: None,
        }
    }
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录收到一个 chunk，第一个 chunk 同时记录 TTFB
    pub fn record_chunk(&mut self, bytes: usize) {
        self.chunk_count += 1;
        self.total_bytes += bytes;

        if self.first_chunk_time.is_none() {
            let now = Utc::now();
            self.first_chunk_time = Some(now);
            self.ttfb_ms = Some((now - self.start_time).num_milliseconds().max(0) as u64);
        }
    }

    /// 记录一条记录，`appended` 为其贡献的字节数
    pub fn record_record(&mut self, appended: usize) {
        self.record_count += 1;
        if appended > 0 {
            self.delta_count += 1;
        }
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    /// 总耗时（毫秒）；未结束时计算到现在
    pub fn duration_ms(&self) -> u64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds().max(0) as u64
    }

    pub fn avg_chunk_size(&self) -> Option<f64> {
        if self.chunk_count == 0 {
            return None;
        }
        Some(self.total_bytes as f64 / self.chunk_count as f64)
    }

    /// 解码失败的数据行 / 全部记录
    pub fn error_rate(&self) -> f64 {
        if self.record_count == 0 {
            return 0.0;
        }
        self.parse_error_count as f64 / self.record_count as f64
    }

    pub fn summary(&self) -> String {
        let ttfb = self
            .ttfb_ms
            .map(|t| format!("{}ms", t))
            .unwrap_or_else(|| "N/A".to_string());

        format!(
            "chunks: {}, bytes: {}, records: {}, deltas: {}, errors: {}, publishes: {}, throttled: {}, answer: {}B, duration: {}ms, ttfb: {}",
            self.chunk_count,
            self.total_bytes,
            self.record_count,
            self.delta_count,
            self.parse_error_count,
            self.publish_count,
            self.throttled_count,
            self.answer_len,
            self.duration_ms(),
            ttfb
        )
    }

    pub fn log_metrics(&self, invocation_id: &str) {
        info!(
            invocation_id = %invocation_id,
            chunk_count = self.chunk_count,
            total_bytes = self.total_bytes,
            record_count = self.record_count,
            delta_count = self.delta_count,
            parse_error_count = self.parse_error_count,
            error_rate = format!("{:.4}", self.error_rate()),
            publish_count = self.publish_count,
            throttled_count = self.throttled_count,
            answer_len = self.answer_len,
            avg_chunk_size = ?self.avg_chunk_size(),
            duration_ms = self.duration_ms(),
            ttfb_ms = ?self.ttfb_ms,
            "流式聚合指标"
        );
    }
}
