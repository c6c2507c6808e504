//! JSON extraction from model replies
//!
//! Models wrap JSON in code fences, add prose around it, or leave trailing
//! commas. These are repaired before parsing; anything else is a parse error.

use serde_json::Value;
use tracing::debug;

use crate::types::{ErrorCategory, LlmError, Result};

pub fn extract_json_from_response(content: &str) -> Result<Value> {
    let cleaned = strip_code_fences(content.trim().trim_start_matches('\u{feff}'));

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }

    debug!("Direct JSON parse failed, attempting repair");
    let candidates = [
        fix_trailing_commas(&cleaned),
        embedded_object(&cleaned).map(fix_trailing_commas).unwrap_or_default(),
    ];
    for candidate in candidates.iter().filter(|c| !c.is_empty()) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return Ok(value);
        }
    }

    Err(LlmError::new(
        ErrorCategory::ParseError,
        format!(
            "Reply is not valid JSON. Preview: {}...",
            cleaned.chars().take(200).collect::<String>()
        ),
    )
    .into())
}

fn strip_code_fences(s: &str) -> String {
    let mut result = s;
    if result.starts_with("```")
        && let Some(first_newline) = result.find('\n')
    {
        result = &result[first_newline + 1..];
    }
    result.trim_end().trim_end_matches("```").trim().to_string()
}

/// Text between the first `{` and the last `}`
fn embedded_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}

fn fix_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in chars.iter().enumerate() {
        if escape {
            escape = false;
        } else if ch == '\\' && in_string {
            escape = true;
        } else if ch == '"' {
            in_string = !in_string;
        } else if ch == ',' && !in_string {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some(']') | Some('}')) {
                continue;
            }
        }
        out.push(ch);
    }
    out
}
