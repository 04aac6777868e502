//! OpenAI 兼容的流式 Chat Completions Provider
use crate::config::ProviderConfig;
use crate::models::openai::ChatCompletionRequest;
use crate::providers::ProviderError;
use crate::streaming::traits::{
    reqwest_stream_to_stream_response, StreamResponse, StreamingProvider,
};
use async_trait::async_trait;
use reqwest::Client;

/// 默认 API 地址
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAICustomProvider {
    pub config: ProviderConfig,
    pub client: Client,
}

impl OpenAICustomProvider {
    /// `client` 可与其他组件共用连接池
    pub fn new(config: ProviderConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn get_base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    /// 构建完整的 API URL
    /// base_url 无论是否带 /v1 都能正确拼接
    fn build_url(&self, endpoint: &str) -> String {
        let base = self.get_base_url().trim_end_matches('/');

        if base.ends_with("/v1") {
            format!("{}/{}", base, endpoint)
        } else {
            format!("{}/v1/{}", base, endpoint)
        }
    }
}

#[async_trait]
impl StreamingProvider for OpenAICustomProvider {
    /// 发起流式 API 调用
    ///
    /// 只做一次请求，不重试；非 2xx 响应读取完响应体后转为 `ProviderError`。
    async fn call_api_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<StreamResponse, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ProviderError::MissingApiKey)?;

        // 确保请求启用流式
        let mut stream_request = request.clone();
        stream_request.stream = true;

        let url = self.build_url("chat/completions");

        tracing::info!(
            "[OPENAI_STREAM] 发起流式请求: url={} model={} messages={}",
            url,
            stream_request.model,
            stream_request.messages.len()
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .header("Accept", "text/event-stream")
            .json(&stream_request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest_error(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!("[OPENAI_STREAM] 请求失败: {} - {}", status, body);
            return Err(ProviderError::from_http_status(status.as_u16(), &body));
        }

        tracing::info!("[OPENAI_STREAM] 流式响应开始: status={}", status);

        Ok(reqwest_stream_to_stream_response(resp))
    }

    fn provider_name(&self) -> &'static str {
        "OpenAICustomProvider"
    }
}
