//! 补全 Provider 模块
//!
//! 只有一个 OpenAI 兼容实现；其他 Provider 实现 `StreamingProvider` 即可接入。

pub mod error;
pub mod openai_custom;

pub use error::ProviderError;
pub use openai_custom::{OpenAICustomProvider, DEFAULT_BASE_URL};
