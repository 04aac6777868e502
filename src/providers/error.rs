//! Provider 错误类型
//!
//! 在聚合循环启动之前由 Provider 抛出：非 2xx 响应、连接失败、缺少配置。
//! relay 不做重试，错误原样交给调用方。

use thiserror::Error;

/// 错误信息中保留的响应体最大字符数
const MAX_BODY_CHARS: usize = 200;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// 连接失败、超时等传输层错误
    #[error("网络连接失败: {0}")]
    Network(String),

    #[error("API key 未配置")]
    MissingApiKey,

    /// 401 / 403
    #[error("认证失败: HTTP {status} - {body}")]
    Unauthorized { status: u16, body: String },

    /// 429
    #[error("请求过于频繁: {body}")]
    RateLimited { body: String },

    /// 其余 4xx，通常是模型名或请求体有误
    #[error("请求被拒绝: HTTP {status} - {body}")]
    Rejected { status: u16, body: String },

    /// 5xx
    #[error("上游服务错误: HTTP {status} - {body}")]
    Upstream { status: u16, body: String },

    #[error("非预期的响应状态: HTTP {status} - {body}")]
    UnexpectedStatus { status: u16, body: String },
}

impl ProviderError {
    /// 按非 2xx 状态码分类，响应体截断到 200 个字符
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let body = truncate_body(body, MAX_BODY_CHARS);
        match status {
            401 | 403 => ProviderError::Unauthorized { status, body },
            429 => ProviderError::RateLimited { body },
            400..=499 => ProviderError::Rejected { status, body },
            500..=599 => ProviderError::Upstream { status, body },
            _ => ProviderError::UnexpectedStatus { status, body },
        }
    }

    pub fn from_reqwest_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Network("请求超时".to_string())
        } else if err.is_connect() {
            ProviderError::Network(format!("无法连接到服务器: {}", err))
        } else if let Some(status) = err.status() {
            ProviderError::from_http_status(status.as_u16(), &err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }

    /// HTTP 状态码；不是由响应状态引起的错误返回 `None`
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Unauthorized { status, .. }
            | ProviderError::Rejected { status, .. }
            | ProviderError::Upstream { status, .. }
            | ProviderError::UnexpectedStatus { status, .. } => Some(*status),
            ProviderError::RateLimited { .. } => Some(429),
            ProviderError::Network(_) | ProviderError::MissingApiKey => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::from_reqwest_error(&err)
    }
}

fn truncate_body(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
