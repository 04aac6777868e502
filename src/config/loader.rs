//! 配置加载
//!
//! YAML 文件 + 环境变量覆盖。环境变量沿用部署时的名字：
//! `API_KEY`、`MODEL`、`OPENAI_BASE_URL`、`SLACK_ACCESS_TOKEN`、`SLACK_BOT_USER_ID`。

use super::path_utils::{default_config_path, expand_tilde};
use super::types::RelayConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("配置解析失败: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("配置校验失败: {0}")]
    Invalid(String),
}

/// 从 YAML 字符串解析配置，缺失字段使用默认值
pub fn parse_config(yaml: &str) -> Result<RelayConfig, ConfigError> {
    if yaml.trim().is_empty() {
        return Ok(RelayConfig::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// 从指定文件加载配置（支持 `~` 展开）
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let path = expand_tilde(path);
    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    parse_config(&content)
}

/// 决定要加载的配置文件
///
/// 显式指定的路径原样返回（加载时必须存在）；否则默认路径存在时返回它，
/// 都没有时返回 `None`，表示使用默认配置。
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(expand_tilde(path)),
        None => {
            let default_path = default_config_path();
            default_path.exists().then_some(default_path)
        }
    }
}

impl RelayConfig {
    /// 用进程环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// 用任意查找函数覆盖配置，空值视为未设置
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(value) = get("API_KEY") {
            self.provider.api_key = Some(value);
        }
        if let Some(value) = get("MODEL") {
            self.provider.model = value;
        }
        if let Some(value) = get("OPENAI_BASE_URL") {
            self.provider.base_url = Some(value);
        }
        if let Some(value) = get("SLACK_ACCESS_TOKEN") {
            self.slack.access_token = Some(value);
        }
        if let Some(value) = get("SLACK_BOT_USER_ID") {
            self.slack.bot_user_id = value;
        }
    }

    /// 校验运行 relay 所需的字段
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = |value: Option<&str>| value.map_or(true, |v| v.trim().is_empty());

        if missing(self.provider.api_key.as_deref()) {
            return Err(ConfigError::Invalid("provider.api_key 未配置".to_string()));
        }
        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.model 不能为空".to_string()));
        }
        if missing(self.slack.access_token.as_deref()) {
            return Err(ConfigError::Invalid("slack.access_token 未配置".to_string()));
        }
        if self.slack.bot_user_id.trim().is_empty() {
            return Err(ConfigError::Invalid("slack.bot_user_id 未配置".to_string()));
        }
        if self.stream.chunk_size == 0 {
            return Err(ConfigError::Invalid("stream.chunk_size 必须大于 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL_YAML: &str = r#"
provider:
  api_key: sk-test
  model: gpt-4o-mini
  base_url: http://localhost:8080/v1
slack:
  access_token: xoxb-test
  bot_user_id: UBOT
stream:
  publish_interval_ms: 1500
logging:
  level: debug
"#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(FULL_YAML).unwrap();
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.slack.bot_user_id, "UBOT");
        assert_eq!(config.slack.api_base_url, "https://slack.com/api");
        assert_eq!(config.stream.publish_interval_ms, 1500);
        assert_eq!(config.stream.chunk_size, 5 * 1024);
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, RelayConfig::default());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = parse_config("provider: [unclosed");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("API_KEY", "sk-env"),
            ("MODEL", "gpt-4o"),
            ("SLACK_ACCESS_TOKEN", "xoxb-env"),
            ("SLACK_BOT_USER_ID", "UENV"),
            ("OPENAI_BASE_URL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = parse_config(FULL_YAML).unwrap();
        config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.provider.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(
            config.provider.base_url.as_deref(),
            Some("http://localhost:8080/v1")
        );
        assert_eq!(config.slack.access_token.as_deref(), Some("xoxb-env"));
        assert_eq!(config.slack.bot_user_id, "UENV");
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let mut config = parse_config(FULL_YAML).unwrap();
        config.stream.chunk_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FULL_YAML.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.slack.access_token.as_deref(), Some("xoxb-test"));

        let resolved = resolve_config_path(Some(file.path()));
        assert_eq!(resolved.as_deref(), Some(file.path()));
        let config = load_config(&resolved.unwrap()).unwrap();
        assert_eq!(config.provider.model, "gpt-4o-mini");
    }

    #[test]
    fn test_resolve_explicit_path_is_kept_even_if_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");

        assert_eq!(resolve_config_path(Some(&missing)), Some(missing.clone()));
        assert!(matches!(load_config(&missing), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_resolve_without_explicit_path_uses_default_only_if_present() {
        match resolve_config_path(None) {
            Some(path) => assert_eq!(path, default_config_path()),
            None => assert!(!default_config_path().exists()),
        }
    }
}
