//! 流式聚合错误类型
//!
//! 定义从读取 Provider 响应体到发布消息整个循环中可能发生的致命错误。
//! 单条记录的 JSON 解析失败不在此列：解析器会跳过该记录并计数。

use thiserror::Error;

/// 流式聚合错误
///
/// 任何一个变体都会终止聚合循环，且不会再发出 finalize 更新。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    /// 读取响应体失败（连接被重置、解码失败等）
    #[error("读取流失败: {0}")]
    Read(String),

    /// 消息 sink 拒绝了更新
    #[error("发布消息失败: {0}")]
    Publish(String),

    /// 响应体在收到 `data: [DONE]` 之前就结束了
    #[error("流在结束标记之前中断")]
    Truncated,

    /// 超过配置的整体超时时间
    #[error("流式响应超时")]
    Timeout,
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StreamError::Timeout
        } else if err.is_decode() {
            StreamError::Read(format!("响应体解码失败: {}", err))
        } else {
            StreamError::Read(err.to_string())
        }
    }
}

impl StreamError {
    /// 创建读取错误
    pub fn read(msg: impl Into<String>) -> Self {
        StreamError::Read(msg.into())
    }

    /// 创建发布错误
    pub fn publish(msg: impl Into<String>) -> Self {
        StreamError::Publish(msg.into())
    }

    /// 获取错误类型字符串（用于结构化日志）
    pub fn error_type(&self) -> &'static str {
        match self {
            StreamError::Read(_) => "read_error",
            StreamError::Publish(_) => "publish_error",
            StreamError::Truncated => "truncated",
            StreamError::Timeout => "timeout",
        }
    }
}
