//! 定长 chunk 读取器
//!
//! 把 Provider 响应体重新切分成不超过 `chunk_size` 的片段，不解释内容。

use crate::streaming::error::StreamError;
use crate::streaming::traits::StreamResponse;
use bytes::Bytes;
use futures::StreamExt;

/// 默认单次读取上限（5 KiB）
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024;

/// 一次读取的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkRead {
    /// 一段字节，可能为空（表示后续还可能有数据）
    Chunk(Bytes),
    /// 响应体已经读完
    EndOfStream,
}

/// chunk 读取器
///
/// 持有响应体的所有权；读取器被 drop 时底层连接随之释放。
pub struct ChunkReader {
    source: StreamResponse,
    chunk_size: usize,
    /// 上一次读取中超出 `chunk_size` 的剩余字节
    pending: Bytes,
    exhausted: bool,
}

impl ChunkReader {
    pub fn new(source: StreamResponse, chunk_size: usize) -> Self {
        Self {
            source,
            chunk_size: chunk_size.max(1),
            pending: Bytes::new(),
            exhausted: false,
        }
    }

    pub fn with_default_size(source: StreamResponse) -> Self {
        Self::new(source, DEFAULT_CHUNK_SIZE)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// 读取下一个 chunk
    ///
    /// 读取错误之后读取器视为已耗尽，后续调用返回 `EndOfStream`。
    pub async fn next_chunk(&mut self) -> Result<ChunkRead, StreamError> {
        if self.pending.is_empty() {
            if self.exhausted {
                return Ok(ChunkRead::EndOfStream);
            }

            match self.source.next().await {
                Some(Ok(bytes)) if bytes.is_empty() => return Ok(ChunkRead::Chunk(bytes)),
                Some(Ok(bytes)) => self.pending = bytes,
                Some(Err(err)) => {
                    self.exhausted = true;
                    return Err(err);
                }
                None => {
                    self.exhausted = true;
                    return Ok(ChunkRead::EndOfStream);
                }
            }
        }

        let take = self.pending.len().min(self.chunk_size);
        Ok(ChunkRead::Chunk(self.pending.split_to(take)))
    }
}
