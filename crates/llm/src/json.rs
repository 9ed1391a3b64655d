//! Recovery of a JSON object from model output
//!
//! Models asked for JSON still wrap it in markdown fences or chatty text.
//! Strict parsing is tried first; otherwise the first balanced `{...}` span
//! that parses as an object wins.

use serde_json::Value;

/// Strip markdown code fences from an LLM response.
fn strip_markdown_fences(response: &str) -> &str {
    let trimmed = response.trim();

    if !trimmed.starts_with("```") {
        return trimmed;
    }

    // Skip the opening fence line (```json or ```)
    let after_fence = match trimmed.find('\n') {
        Some(newline_pos) => &trimmed[newline_pos + 1..],
        None => trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .unwrap_or(trimmed),
    };

    match after_fence.rfind("```") {
        Some(close_pos) => after_fence[..close_pos].trim(),
        None => after_fence.trim(),
    }
}

/// Balanced `{...}` span starting at `start_pos`, ignoring braces in strings.
fn extract_balanced_at(content: &str, start_pos: usize) -> Option<&str> {
    let json_content = content.get(start_pos..)?;
    if !json_content.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in json_content.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&json_content[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_object(s: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(s) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Extract a JSON object from an LLM response.
///
/// Handles:
/// - Plain objects: `{...}`
/// - Markdown code blocks: ```json\n{...}\n```
/// - Chatty prefixes and trailing explanations around the object
/// - Brace-like false positives (validated with serde_json)
///
/// Arrays and scalars are rejected: every caller expects an object.
pub fn extract_json_object(response: &str) -> Option<Value> {
    if let Some(value) = parse_object(response.trim()) {
        return Some(value);
    }

    let content = strip_markdown_fences(response);
    content
        .match_indices('{')
        .filter_map(|(pos, _)| extract_balanced_at(content, pos))
        .find_map(parse_object)
}
