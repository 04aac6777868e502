//! 配置管理模块
//!
//! 提供 YAML 配置文件加载、环境变量覆盖和校验

mod loader;
mod path_utils;
mod types;

pub use loader::{load_config, parse_config, resolve_config_path, ConfigError};
pub use path_utils::{default_config_path, expand_tilde};
pub use types::{LoggingConfig, ProviderConfig, RelayConfig, SlackConfig};
