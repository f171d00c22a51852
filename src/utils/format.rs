use regex::Regex;
use std::sync::LazyLock;

/// Zero width space, used where Discord refuses empty text.
pub const ZERO_WIDTH_SPACE: &str = "\u{200b}";

/// Discord's `og_blurple`.
pub const BLURPLE: u32 = 0x7289da;

static CODEBLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^```([a-zA-Z\-]+)?([\s\S]+?)```").unwrap_or_else(|_| unreachable!())
});

/// Cuts `text` down to `max` characters, appending `end` when anything was cut.
///
/// `max` defaults to 1900 inside a code block and 1990 otherwise.
pub fn trim(text: &str, max: Option<usize>, code_block: bool, end: &str) -> String {
    let max = max.unwrap_or(if code_block { 1900 } else { 1990 });

    let mut trimmed: String = text.chars().take(max).collect();
    if text.chars().count() > max {
        trimmed.push_str(end);
    }

    if code_block {
        format!("```\n{}\n```", trimmed)
    } else {
        trimmed
    }
}

/// Splits a leading Markdown code fence into its language and body.
pub fn remove_codeblock(text: &str) -> (Option<&str>, &str) {
    match CODEBLOCK.captures(text) {
        Some(captures) => (
            captures.get(1).map(|m| m.as_str()),
            captures.get(2).map(|m| m.as_str()).unwrap_or_default(),
        ),
        None => (None, text),
    }
}

/// `1234567` -> `1,234,567`
pub fn thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn format_error_message(error: &str) -> String {
    format!("❌ **Error**: {}", error)
}
