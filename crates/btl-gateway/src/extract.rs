//! Pull a JSON value out of free-form model output.
//!
//! Models wrap JSON in code fences or surround it with prose despite being
//! told not to. Extraction tries, in order: the whole trimmed text, the
//! first fenced block, then the outermost `{ ... }` span.

use serde_json::Value;

/// Extract the first parseable JSON value from `raw`.
#[must_use]
pub fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    if let Some(block) = fenced_block(trimmed)
        && let Ok(value) = serde_json::from_str(block.trim())
    {
        return Some(value);
    }
    outer_object(trimmed).and_then(|span| serde_json::from_str(span).ok())
}

/// Body of the first ```` ``` ```` fenced block, language tag stripped.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let rest = text.get(open.checked_add(3)?..)?;
    // Skip an info string such as `json` up to the end of the line.
    let body_start = rest.find('\n').map_or(0, |nl| nl.saturating_add(1));
    let body = rest.get(body_start..)?;
    let close = body.find("```")?;
    body.get(..close)
}

/// Span from the first `{` to the last `}`, inclusive.
fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}
