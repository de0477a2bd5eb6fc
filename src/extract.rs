//! Pull one candidate JSON object out of noisy model output.
//!
//! Handles:
//! - Pure JSON responses
//! - JSON wrapped in markdown code fences
//! - JSON embedded in prose
//!
//! The brace scanner counts every `{` and `}` it sees, including ones inside
//! string literals. A string value with unbalanced braces can end the object
//! early or late; the caller's parse then fails and the stage falls back.

/// Extract a JSON object candidate from raw model text.
///
/// Returns the substring from the first `{` to the brace that closes it. When
/// there is no `{`, or the object never closes, `raw` itself comes back
/// untouched so the caller's parser fails explicitly.
pub fn extract_json(raw: &str) -> &str {
    let text = strip_code_fence(raw.trim());

    let Some(start) = text.find('{') else {
        return raw;
    };

    let remainder = &text[start..];
    match find_closing_brace(remainder) {
        Some(end) => &remainder[..end],
        None => raw,
    }
}

/// Unwrap a ```lang ... ``` block if the text starts with a fence.
fn strip_code_fence(text: &str) -> &str {
    let Some(after_ticks) = text.strip_prefix("```") else {
        return text;
    };

    // Drop the info string ("json", "text", ...) up to the first newline.
    let body = match after_ticks.find('\n') {
        Some(newline) => &after_ticks[newline + 1..],
        None => after_ticks,
    };

    let body = match body.rfind("```") {
        Some(close) => &body[..close],
        None => body,
    };

    body.trim()
}

/// Byte offset just past the brace that returns depth to zero.
fn find_closing_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
