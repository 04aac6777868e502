//! 配置类型定义

use crate::streaming::StreamConfig;
use serde::{Deserialize, Serialize};

/// 顶层配置
///
/// 在构造 relay 时显式传入，引擎内部不读取任何环境变量。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 补全 Provider 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    /// 为空时使用 https://api.openai.com
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: default_model(),
        }
    }
}

/// Slack 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token（xoxb-...）
    #[serde(default)]
    pub access_token: Option<String>,
    /// Bot 自己的用户 ID，用于区分 assistant 消息和检测提及
    #[serde(default)]
    pub bot_user_id: String,
    #[serde(default = "default_slack_api_base_url")]
    pub api_base_url: String,
}

fn default_slack_api_base_url() -> String {
    "https://slack.com/api".to_string()
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            bot_user_id: String::new(),
            api_base_url: default_slack_api_base_url(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing 过滤表达式，例如 `info` 或 `threadcast_lib=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
