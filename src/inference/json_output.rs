//! JSON extraction from free-form model output.
//!
//! Models asked for "a JSON object" still wrap it in markdown fences, prepend
//! a sentence, drop a closing brace or leave a trailing comma. Extraction is
//! tried as-is first, then after each repair in turn.

use serde_json::{Map, Value};

use super::errors::InferenceError;

/// Parse the first JSON object embedded in `text`.
///
/// Returns `InvalidJson` when no object can be recovered or the recovered
/// value is not an object.
pub fn parse_json_object(text: &str) -> Result<Map<String, Value>, InferenceError> {
    let candidate = extract_json(text);
    let value = repair_json(candidate).ok_or_else(|| InferenceError::InvalidJson {
        raw_output: text.to_string(),
        reason: "no parseable JSON object found".into(),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(InferenceError::InvalidJson {
            raw_output: text.to_string(),
            reason: format!("expected an object, got {}", json_kind(&other)),
        }),
    }
}

/// Slice from the first `{` to the last `}` (or to the end when the closing
/// brace is missing). Returns the input unchanged when there is no `{`.
fn extract_json(text: &str) -> &str {
    let Some(start) = text.find('{') else {
        return text;
    };
    match text.rfind('}') {
        Some(end) if end > start => &text[start..=end],
        _ => &text[start..],
    }
}

/// Apply repairs cumulatively, returning the first successful parse.
fn repair_json(raw: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        return Some(v);
    }

    let repairs: [fn(&str) -> String; 3] = [
        repair_trailing_commas,
        repair_unbalanced_braces,
        repair_control_characters,
    ];

    let mut repaired = raw.to_string();
    for repair in repairs {
        repaired = repair(&repaired);
        if let Ok(v) = serde_json::from_str::<Value>(&repaired) {
            tracing::debug!("repaired malformed model JSON");
            return Some(v);
        }
    }

    None
}

/// Remove commas that directly precede `}` or `]` outside of strings.
fn repair_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut result = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &ch) in chars.iter().enumerate() {
        if escape_next {
            escape_next = false;
        } else if ch == '\\' && in_string {
            escape_next = true;
        } else if ch == '"' {
            in_string = !in_string;
        } else if ch == ',' && !in_string {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        result.push(ch);
    }

    result
}

/// Append closing braces to balance unmatched opening braces.
fn repair_unbalanced_braces(input: &str) -> String {
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for ch in input.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => depth -= 1,
            _ => {}
        }
    }

    let mut result = input.to_string();
    if in_string {
        result.push('"');
    }
    for _ in 0..depth.max(0) {
        result.push('}');
    }
    result
}

/// Remove control characters other than `\n`, `\r` and `\t`.
fn repair_control_characters(input: &str) -> String {
    input
        .chars()
        .filter(|&c| !c.is_control() || c == '\n' || c == '\r' || c == '\t')
        .collect()
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
