//! 配置文件路径工具

use std::path::{Path, PathBuf};

/// 默认配置文件位置（相对用户主目录）
const DEFAULT_CONFIG_RELATIVE: &str = ".threadcast/config.yaml";

/// 展开开头的 `~` 或 `~/`
///
/// `~user/...` 不支持，原样返回；无法获取主目录时也原样返回。
pub fn expand_tilde<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    let Some(path_str) = path.to_str() else {
        return path.to_path_buf();
    };

    let rest = match path_str {
        "~" => "",
        s => match s.strip_prefix("~/") {
            Some(rest) => rest,
            None => return path.to_path_buf(),
        },
    };

    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// 默认配置文件路径：`~/.threadcast/config.yaml`
pub fn default_config_path() -> PathBuf {
    expand_tilde(format!("~/{}", DEFAULT_CONFIG_RELATIVE))
}
