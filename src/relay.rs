//! 单次调用的 relay 处理器
//!
//! 事件分类 → 读取线程历史 → 构建对话 → 发起流式补全 → 发布占位消息 →
//! 聚合并节流更新，直到流结束。

use crate::config::{ConfigError, RelayConfig};
use crate::models::openai::ChatCompletionRequest;
use crate::providers::{OpenAICustomProvider, ProviderError};
use crate::slack::{build_conversation, SlackClient, SlackError, SlackEventData, ThreadHistory};
use crate::streaming::{
    MessageRef, MessageSink, SinkError, StreamAggregator, StreamError, StreamMetrics,
    StreamingProvider,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("读取线程历史失败: {0}")]
    History(#[from] SlackError),

    #[error("补全请求失败: {0}")]
    Provider(#[from] ProviderError),

    #[error("发布占位消息失败: {0}")]
    Placeholder(#[source] SinkError),

    #[error("流式聚合失败: {0}")]
    Stream(#[from] StreamError),
}

impl RelayError {
    pub fn error_type(&self) -> &'static str {
        match self {
            RelayError::Config(_) => "config",
            RelayError::History(_) => "history",
            RelayError::Provider(_) => "provider",
            RelayError::Placeholder(_) => "placeholder",
            RelayError::Stream(_) => "stream",
        }
    }

    /// 补全接口返回的 HTTP 状态码
    pub fn http_status(&self) -> Option<u16> {
        match self {
            RelayError::Provider(err) => err.status(),
            _ => None,
        }
    }
}

/// 成功完成一次调用的结果
#[derive(Debug, Clone)]
pub struct RelaySummary {
    pub invocation_id: String,
    pub message: MessageRef,
    pub answer: String,
    pub metrics: StreamMetrics,
}

#[derive(Debug, Clone)]
pub enum RelayOutcome {
    /// 事件不需要回复
    Ignored,
    Completed(RelaySummary),
}

pub struct RelayHandler {
    config: RelayConfig,
    provider: Arc<dyn StreamingProvider>,
    sink: Arc<dyn MessageSink>,
    history: Arc<dyn ThreadHistory>,
}

impl RelayHandler {
    pub fn new(
        config: RelayConfig,
        provider: Arc<dyn StreamingProvider>,
        sink: Arc<dyn MessageSink>,
        history: Arc<dyn ThreadHistory>,
    ) -> Self {
        Self {
            config,
            provider,
            sink,
            history,
        }
    }

    /// 用 OpenAI 兼容 Provider 和 Slack Web API 构建处理器
    pub fn from_config(config: RelayConfig) -> Result<Self, RelayError> {
        config.validate()?;
        // Provider 和 Slack 共用一个连接池
        let client = reqwest::Client::new();
        let provider = Arc::new(OpenAICustomProvider::new(config.provider.clone(), client.clone()));
        let slack = Arc::new(SlackClient::new(config.slack.clone(), client));
        Ok(Self::new(config, provider, slack.clone(), slack))
    }

    /// 处理一个入站事件
    pub async fn handle(&self, event: &SlackEventData) -> Result<RelayOutcome, RelayError> {
        let bot_user_id = &self.config.slack.bot_user_id;
        if !event.should_respond(bot_user_id) {
            info!(
                event_type = %event.event_type,
                channel = %event.channel,
                "[RELAY] 事件无需回复，跳过"
            );
            return Ok(RelayOutcome::Ignored);
        }

        let invocation_id = Uuid::new_v4().to_string();
        info!(
            invocation_id = %invocation_id,
            event_type = %event.event_type,
            channel = %event.channel,
            user = %event.user,
            provider = self.provider.provider_name(),
            "[RELAY] 开始处理事件"
        );

        let result = self.relay(event, &invocation_id).await;
        if let Err(err) = &result {
            error!(
                invocation_id = %invocation_id,
                error = %err,
                error_type = err.error_type(),
                http_status = ?err.http_status(),
                "[RELAY] 处理事件失败"
            );
        }
        result.map(RelayOutcome::Completed)
    }

    async fn relay(
        &self,
        event: &SlackEventData,
        invocation_id: &str,
    ) -> Result<RelaySummary, RelayError> {
        let thread = self
            .history
            .replies(&event.channel, event.history_ts())
            .await?;
        let conversation = build_conversation(&self.config.slack.bot_user_id, &thread);
        let request = ChatCompletionRequest::streaming(&self.config.provider.model, conversation);

        let stream = self.provider.call_api_stream(&request).await?;

        let message = self
            .sink
            .post(
                &event.channel,
                &self.config.stream.placeholder_text,
                &event.time_stamp,
            )
            .await
            .map_err(RelayError::Placeholder)?;

        let outcome = StreamAggregator::new(
            self.sink.as_ref(),
            message.clone(),
            self.config.stream.clone(),
        )
        .with_mention(event.user.as_str())
        .with_invocation_id(invocation_id)
        .run(stream)
        .await?;

        info!(
            invocation_id = %invocation_id,
            answer_len = outcome.answer.len(),
            "[RELAY] 事件处理完成"
        );

        Ok(RelaySummary {
            invocation_id: invocation_id.to_string(),
            message,
            answer: outcome.answer,
            metrics: outcome.metrics,
        })
    }
}
