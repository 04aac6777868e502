//! 提及（`<@USER>`）处理

use once_cell::sync::Lazy;
use regex::Regex;

/// 非贪婪匹配任意用户提及
static MENTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("<@.+?>").unwrap_or_else(|e| unreachable!("静态正则无效: {}", e))
});

/// 文本中是否提及了指定用户
pub fn is_bot_mentioned(text: &str, bot_user_id: &str) -> bool {
    !bot_user_id.is_empty() && text.contains(&format!("<@{}>", bot_user_id))
}

/// 删除文本中所有的用户提及
pub fn strip_mentions(text: &str) -> String {
    MENTION_RE.replace_all(text, "").into_owned()
}

/// 在文本末尾另起一行提及用户
pub fn with_mention(text: &str, user_id: &str) -> String {
    format!("{}\n<@{}>", text, user_id)
}
