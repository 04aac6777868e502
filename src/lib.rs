//! threadcast: 把 Slack 线程转发给流式 Chat Completions 接口，
//! 并把不断增长的回答节流地更新回线程。

pub mod config;
pub mod models;
pub mod providers;
pub mod relay;
pub mod slack;
pub mod streaming;

pub use config::RelayConfig;
pub use relay::{RelayError, RelayHandler, RelayOutcome, RelaySummary};
