//! SSE 行解析器
//!
//! 把任意切分的字节拼成以 `\n` 结尾的行，识别 `data: ` 前缀和
//! `data: [DONE]` 结束标记。
//!
//! 跨 chunk 的半行会保留到下一次 `feed`，流结束时由 `finish` 冲刷。
//! 单行 JSON 解析失败只记录并计数，不会终止流。

use crate::models::openai::ChatCompletionChunk;
use tracing::warn;

/// 数据行前缀
pub const DATA_PREFIX: &str = "data: ";

/// 结束标记行
pub const DONE_SENTINEL: &str = "data: [DONE]";

/// 解析出的一条记录
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRecord {
    /// 成功解码的 `data:` 负载
    Chunk(ChatCompletionChunk),
    /// 结束标记
    Terminal,
    /// 非数据行，或解码失败的数据行
    Unrecognized,
}

/// 解析单行（不含换行符）
///
/// 非 `data: ` 行返回 `Unrecognized`；数据行解码失败返回 `Err`。
pub fn parse_line(line: &str) -> Result<StreamRecord, serde_json::Error> {
    if line == DONE_SENTINEL {
        return Ok(StreamRecord::Terminal);
    }

    match line.strip_prefix(DATA_PREFIX) {
        Some(payload) => serde_json::from_str(payload).map(StreamRecord::Chunk),
        None => Ok(StreamRecord::Unrecognized),
    }
}

/// 行解析器
#[derive(Debug, Default)]
pub struct EventLineParser {
    /// 尚未遇到换行符的尾部字节
    buffer: Vec<u8>,
    /// 是否已看到结束标记
    terminated: bool,
    /// 解码失败的数据行数量
    malformed_count: u32,
}

impl EventLineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// 输入一个 chunk，返回其中所有完整行对应的记录
    ///
    /// 一旦返回 `Terminal`，它必定是最后一条记录，之后的输入全部丢弃。
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamRecord> {
        if self.terminated {
            return Vec::new();
        }

        // 保留的半行里不会有换行符，只需扫描新追加的字节
        let mut search_from = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[search_from..].iter().position(|b| *b == b'\n') {
            let end = search_from + offset;
            let record = decode_line(&self.buffer[start..end], &mut self.malformed_count);
            start = end + 1;
            search_from = start;

            if record == StreamRecord::Terminal {
                self.terminated = true;
                self.buffer.clear();
                records.push(record);
                return records;
            }
            records.push(record);
        }

        self.buffer.drain(..start);
        records
    }

    /// 流结束时冲刷缓冲区中最后一个没有换行符的行
    pub fn finish(&mut self) -> Vec<StreamRecord> {
        if self.terminated || self.buffer.is_empty() {
            self.buffer.clear();
            return Vec::new();
        }

        let tail = std::mem::take(&mut self.buffer);
        let record = decode_line(&tail, &mut self.malformed_count);
        if record == StreamRecord::Terminal {
            self.terminated = true;
        }
        vec![record]
    }

    /// 是否已看到结束标记
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// 解码失败的数据行数量
    pub fn malformed_count(&self) -> u32 {
        self.malformed_count
    }

    /// 当前保留的半行字节数
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(raw: &[u8], malformed_count: &mut u32) -> StreamRecord {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim_end_matches('\r');

    match parse_line(line) {
        Ok(record) => record,
        Err(err) => {
            *malformed_count += 1;
            warn!(
                error = %err,
                line_len = line.len(),
                column = err.column(),
                "[STREAM_PARSER] 跳过无法解析的数据行"
            );
            StreamRecord::Unrecognized
        }
    }
}
