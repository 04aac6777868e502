use clap::Parser;
use std::path::{Path, PathBuf};

/// 读取一个 Slack 事件，把流式补全的回答更新到线程中
#[derive(Parser, Debug)]
#[command(name = "threadcast")]
#[command(version, about)]
pub struct Cli {
    /// 配置文件路径（默认 ~/.threadcast/config.yaml）
    #[arg(short, long, env = "THREADCAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// 事件 JSON 文件；省略或为 `-` 时从标准输入读取
    pub event_file: Option<PathBuf>,
}

impl Cli {
    /// 事件文件路径，`None` 表示标准输入
    pub fn event_path(&self) -> Option<&Path> {
        self.event_file
            .as_deref()
            .filter(|path| *path != Path::new("-"))
    }
}
