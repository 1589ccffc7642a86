//! Parameter extraction for handlers.
//!
//! Classifier output is loosely typed: numbers arrive as strings, booleans
//! as `"true"`, and absent optionals as `null` or `""`. These helpers accept
//! all of those and apply the documented defaults.

use serde_json::Value;

use super::HandlerError;
use crate::agent_core::types::Parameters;
use crate::reddit::{Page, Sort};

/// Default page size for listing-style handlers.
pub const DEFAULT_LIMIT: u32 = 10;

/// Largest page Reddit will return.
pub const MAX_LIMIT: u32 = 100;

/// A non-empty string value, or `None` for missing/null/blank.
pub fn optional_str(params: &Parameters, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Like [`optional_str`] but missing is an error.
pub fn required_str(params: &Parameters, key: &str) -> Result<String, HandlerError> {
    optional_str(params, key).ok_or_else(|| HandlerError::MissingParameter {
        name: key.to_string(),
    })
}

/// Boolean flag; accepts JSON booleans and `"true"`/`"false"` strings.
pub fn optional_bool(params: &Parameters, key: &str, default: bool) -> Result<bool, HandlerError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "true" | "yes" => Ok(true),
            "false" | "no" => Ok(false),
            other => Err(HandlerError::InvalidParameter {
                name: key.to_string(),
                reason: format!("expected a boolean, got '{other}'"),
            }),
        },
        Some(other) => Err(HandlerError::InvalidParameter {
            name: key.to_string(),
            reason: format!("expected a boolean, got {other}"),
        }),
    }
}

/// `limit`, defaulting to [`DEFAULT_LIMIT`] and clamped to `1..=MAX_LIMIT`.
pub fn limit(params: &Parameters) -> Result<u32, HandlerError> {
    let raw = match params.get("limit") {
        None | Some(Value::Null) => return Ok(DEFAULT_LIMIT),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(DEFAULT_LIMIT),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    let n = raw.ok_or_else(|| HandlerError::InvalidParameter {
        name: "limit".into(),
        reason: "expected a number".into(),
    })?;
    Ok(n.clamp(1.0, f64::from(MAX_LIMIT)) as u32)
}

/// `sort`, `limit` and `after` as a [`Page`].
///
/// An `after` of `0` (the historical "no cursor" value) is treated as absent.
pub fn page(params: &Parameters) -> Result<Page, HandlerError> {
    let after = optional_str(params, "after").filter(|a| a != "0");
    Ok(Page {
        sort: Sort::parse_or_default(optional_str(params, "sort").as_deref()),
        limit: limit(params)?,
        after,
    })
}

/// Longest subreddit name Reddit accepts.
const MAX_SUBREDDIT_LEN: usize = 21;

/// A subreddit name with any leading `r/` or `/r/` stripped.
///
/// Names end up as a URL path segment, so anything outside
/// `[A-Za-z0-9_]{2,21}` is rejected rather than passed through.
pub fn subreddit_name(raw: &str) -> Result<String, HandlerError> {
    let name = raw
        .trim()
        .trim_start_matches('/')
        .trim_start_matches("r/")
        .trim_end_matches('/');
    let valid = (2..=MAX_SUBREDDIT_LEN).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(HandlerError::InvalidParameter {
            name: "subreddit".into(),
            reason: format!("'{raw}' is not a subreddit name"),
        });
    }
    Ok(name.to_string())
}

/// A post id in base-36, with or without its `t3_` prefix.
pub fn post_id(raw: &str) -> Result<String, HandlerError> {
    let id = raw.trim();
    let bare = id.strip_prefix("t3_").unwrap_or(id);
    if bare.is_empty() || !bare.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(HandlerError::InvalidParameter {
            name: "post_id".into(),
            reason: format!("'{raw}' is not a post id"),
        });
    }
    Ok(id.to_string())
}
