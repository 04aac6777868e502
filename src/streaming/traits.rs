//! 流式聚合的外部接口
//!
//! - `StreamingProvider`: 发起流式补全请求，返回字节流
//! - `MessageSink`: 创建占位消息并反复更新它

use crate::models::openai::ChatCompletionRequest;
use crate::providers::ProviderError;
use crate::streaming::StreamError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

/// 流式响应类型别名
///
/// 每个 Item 是一段原始字节或读取错误，与行边界没有任何对齐关系。
pub type StreamResponse = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// 流式 Provider Trait
#[async_trait]
pub trait StreamingProvider: Send + Sync {
    /// 发起流式 API 调用
    ///
    /// 非 2xx 响应在这里就以 `ProviderError` 返回，聚合循环不会启动。
    async fn call_api_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<StreamResponse, ProviderError>;

    /// 获取 Provider 名称，用于日志
    fn provider_name(&self) -> &'static str;
}

/// 已发布消息的定位信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    /// 频道 ID
    pub channel: String,
    /// 消息时间戳（Slack 用它作为消息 ID）
    pub ts: String,
}

impl MessageRef {
    pub fn new(channel: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ts: ts.into(),
        }
    }
}

/// sink 返回的错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SinkError(pub String);

/// 消息 sink
///
/// 调用方保证同一条消息的 `update` 按发出顺序生效。
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// 在 `thread_ts` 所在的线程中发布占位消息
    async fn post(
        &self,
        channel: &str,
        placeholder: &str,
        thread_ts: &str,
    ) -> Result<MessageRef, SinkError>;

    /// 用完整文本替换消息内容
    ///
    /// `mention` 非空时在文本末尾追加对该用户的提及。
    async fn update(
        &self,
        message: &MessageRef,
        text: &str,
        mention: Option<&str>,
    ) -> Result<(), SinkError>;
}

/// 将 reqwest 的 bytes_stream 转换为 StreamResponse
pub fn reqwest_stream_to_stream_response(response: reqwest::Response) -> StreamResponse {
    use futures::StreamExt;

    let stream = response.bytes_stream().map(|result| result.map_err(StreamError::from));

    Box::pin(stream)
}
