//! Slack Web API 客户端
//!
//! 只用到三个方法：`chat.postMessage`、`chat.update`、`conversations.replies`。
//! Slack 在业务错误时仍返回 HTTP 200，以 `ok: false` + `error` 表示失败。

use super::error::SlackError;
use super::history::{ThreadHistory, ThreadMessage};
use super::mention::with_mention;
use crate::config::SlackConfig;
use crate::streaming::traits::{MessageRef, MessageSink, SinkError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

// ============================================================================
// 响应模型
// ============================================================================

/// 所有 Web API 响应共有的信封
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PostMessageBody {
    channel: String,
    ts: String,
}

#[derive(Debug, Deserialize)]
struct UpdateBody {}

#[derive(Debug, Deserialize)]
struct RepliesBody {
    #[serde(default)]
    messages: Vec<ThreadMessage>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Serialize)]
struct RepliesQuery<'a> {
    channel: &'a str,
    ts: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

// ============================================================================
// 客户端
// ============================================================================

pub struct SlackClient {
    config: SlackConfig,
    client: Client,
}

impl SlackClient {
    /// `client` 可与其他组件共用连接池
    pub fn new(config: SlackConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn token(&self) -> Result<&str, SlackError> {
        self.config
            .access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(SlackError::MissingToken)
    }

    fn build_url(&self, method: &str) -> String {
        format!("{}/{}", self.config.api_base_url.trim_end_matches('/'), method)
    }

    /// 解析信封，`ok: false` 转为 `SlackError::Api`
    async fn read_envelope<T: DeserializeOwned>(
        method: &str,
        resp: reqwest::Response,
    ) -> Result<T, SlackError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!("[SLACK] {} HTTP 错误: {} - {}", method, status, body);
            return Err(SlackError::Transport(format!("HTTP {}", status)));
        }

        let envelope: ApiEnvelope<T> = resp.json().await?;
        if !envelope.ok {
            let code = envelope.error.unwrap_or_else(|| "unknown_error".to_string());
            tracing::warn!("[SLACK] {} 返回错误: {}", method, code);
            return Err(SlackError::Api(code));
        }
        envelope
            .body
            .ok_or_else(|| SlackError::Decode(format!("{} 响应缺少字段", method)))
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: serde_json::Value,
    ) -> Result<T, SlackError> {
        let resp = self
            .client
            .post(self.build_url(method))
            .bearer_auth(self.token()?)
            .json(&payload)
            .send()
            .await?;
        Self::read_envelope(method, resp).await
    }

    /// 在线程中发布消息，返回消息定位
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: &str,
    ) -> Result<MessageRef, SlackError> {
        let mut payload = json!({ "channel": channel, "text": text });
        if !thread_ts.is_empty() {
            payload["thread_ts"] = json!(thread_ts);
        }
        let body: PostMessageBody = self.call_json("chat.postMessage", payload).await?;
        tracing::debug!("[SLACK] 已发布消息: channel={} ts={}", body.channel, body.ts);
        Ok(MessageRef::new(body.channel, body.ts))
    }

    /// 替换消息文本
    pub async fn update_message(&self, message: &MessageRef, text: &str) -> Result<(), SlackError> {
        let payload = json!({ "channel": message.channel, "ts": message.ts, "text": text });
        let _: UpdateBody = self.call_json("chat.update", payload).await?;
        Ok(())
    }

    /// 读取线程的全部回复，自动翻页
    pub async fn conversation_replies(
        &self,
        channel: &str,
        ts: &str,
    ) -> Result<Vec<ThreadMessage>, SlackError> {
        let token = self.token()?;
        let url = self.build_url("conversations.replies");
        let mut messages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let query = RepliesQuery {
                channel,
                ts,
                cursor: cursor.as_deref(),
            };
            let resp = self
                .client
                .get(&url)
                .bearer_auth(token)
                .query(&query)
                .send()
                .await?;
            let page: RepliesBody = Self::read_envelope("conversations.replies", resp).await?;
            messages.extend(page.messages);

            let next = page
                .response_metadata
                .map(|meta| meta.next_cursor)
                .filter(|c| !c.is_empty());
            match next {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        tracing::debug!(
            "[SLACK] 读取线程历史: channel={} ts={} count={}",
            channel,
            ts,
            messages.len()
        );
        Ok(messages)
    }
}

#[async_trait]
impl MessageSink for SlackClient {
    async fn post(
        &self,
        channel: &str,
        placeholder: &str,
        thread_ts: &str,
    ) -> Result<MessageRef, SinkError> {
        self.post_message(channel, placeholder, thread_ts)
            .await
            .map_err(|e| SinkError(e.to_string()))
    }

    async fn update(
        &self,
        message: &MessageRef,
        text: &str,
        mention: Option<&str>,
    ) -> Result<(), SinkError> {
        let text = match mention {
            Some(user) => with_mention(text, user),
            None => text.to_string(),
        };
        self.update_message(message, &text)
            .await
            .map_err(|e| SinkError(e.to_string()))
    }
}

#[async_trait]
impl ThreadHistory for SlackClient {
    async fn replies(&self, channel: &str, ts: &str) -> Result<Vec<ThreadMessage>, SlackError> {
        self.conversation_replies(channel, ts).await
    }
}
