//! Slack Web API 错误

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlackError {
    /// Web API 返回 `ok: false`，携带 Slack 的错误码
    #[error("Slack API 错误: {0}")]
    Api(String),

    #[error("Slack 请求失败: {0}")]
    Transport(String),

    #[error("Slack 响应解析失败: {0}")]
    Decode(String),

    #[error("Slack access token 未配置")]
    MissingToken,
}

impl SlackError {
    pub fn error_type(&self) -> &'static str {
        match self {
            SlackError::Api(_) => "api",
            SlackError::Transport(_) => "transport",
            SlackError::Decode(_) => "decode",
            SlackError::MissingToken => "missing_token",
        }
    }
}

impl From<reqwest::Error> for SlackError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SlackError::Decode(err.to_string())
        } else {
            SlackError::Transport(err.to_string())
        }
    }
}
