//! 增量文本累积器

use crate::models::openai::ChatCompletionChunk;
use crate::streaming::parser::StreamRecord;

/// 取出第一个 choice 的增量文本
///
/// choices 为空、delta 缺失或 content 为 null 时返回 `None`。
pub fn extract_delta(chunk: &ChatCompletionChunk) -> Option<&str> {
    chunk.choices.first()?.delta.as_ref()?.content.as_deref()
}

/// 累积中的回答
///
/// 只追加、不裁剪、不去重，保留 Provider 输出的原始空白和换行。
#[derive(Debug, Default, Clone)]
pub struct DeltaAccumulator {
    answer: String,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 处理一条记录，返回追加的字节数
    pub fn apply(&mut self, record: &StreamRecord) -> usize {
        match record {
            StreamRecord::Chunk(chunk) => match extract_delta(chunk) {
                Some(text) => {
                    self.answer.push_str(text);
                    text.len()
                }
                None => 0,
            },
            StreamRecord::Terminal | StreamRecord::Unrecognized => 0,
        }
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn len(&self) -> usize {
        self.answer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answer.is_empty()
    }

    pub fn into_answer(self) -> String {
        self.answer
    }
}
