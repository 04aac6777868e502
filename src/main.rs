mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use std::io::Read;
use std::path::Path;
use threadcast_lib::config::{load_config, resolve_config_path};
use threadcast_lib::slack::SlackEventData;
use threadcast_lib::{RelayConfig, RelayHandler, RelayOutcome};

fn read_event(path: Option<&Path>) -> Result<SlackEventData> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("读取事件文件失败: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("读取标准输入失败")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("事件 JSON 解析失败")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());
    let mut config = match &config_path {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    config.apply_env_overrides();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with_target(false)
        .with_line_number(true)
        .init();

    match &config_path {
        Some(path) => tracing::info!(path = %path.display(), "[CONFIG] 已加载配置文件"),
        None => tracing::info!("[CONFIG] 未找到配置文件，使用默认配置和环境变量"),
    }

    let event = read_event(cli.event_path())?;
    let handler = RelayHandler::from_config(config)?;

    match handler.handle(&event).await? {
        RelayOutcome::Ignored => tracing::info!("事件已忽略"),
        RelayOutcome::Completed(summary) => tracing::info!(
            invocation_id = %summary.invocation_id,
            channel = %summary.message.channel,
            ts = %summary.message.ts,
            "{}",
            summary.metrics.summary()
        ),
    }

    Ok(())
}
