//! Envelope normalization.
//!
//! The backend does not commit to one response shape: a list endpoint may
//! answer with a bare array, `{"data": [..]}`, `{"students": [..]}` or even
//! `{"data": {"students": [..]}}`. Callers hand the raw body here and get the
//! canonical payload back. Nothing in this module errors or panics on
//! malformed input; unknown shapes degrade to an empty value.

use serde_json::Value;

/// Pull the canonical list out of a response body.
///
/// Candidates are tried in order: bare array, `data`, `<key>`, `data.<key>`.
/// Returns an empty list when none of them is an array.
pub fn extract_list(body: &Value, key: &str) -> Vec<Value> {
    if let Some(arr) = body.as_array() {
        return arr.clone();
    }
    let candidates = [
        body.get("data"),
        body.get(key),
        body.get("data").and_then(|d| d.get(key)),
    ];
    for candidate in candidates {
        if let Some(arr) = candidate.and_then(Value::as_array) {
            return arr.clone();
        }
    }
    Vec::new()
}

/// Pull a single record out of a response body.
///
/// Most-nested envelope first, so `{"data": {"student": {..}}}` unwraps all
/// the way down to the record: `data.<key>`, `<key>`, `data`, then a body
/// that is itself a plain object (no envelope keys). Returns `None` when no
/// candidate is an object.
pub fn extract_object(body: &Value, key: &str) -> Option<Value> {
    let candidates = [
        body.get("data").and_then(|d| d.get(key)),
        body.get(key),
        body.get("data"),
    ];
    for candidate in candidates.into_iter().flatten() {
        if candidate.is_object() {
            return Some(candidate.clone());
        }
    }
    match body.as_object() {
        Some(map) if !map.is_empty() && !map.contains_key("data") && !map.contains_key(key) => {
            Some(body.clone())
        }
        _ => None,
    }
}

/// Pull a named string field (`token`, `message`, ...) out of a response
/// body, looking at the top level and then under `data`.
pub fn extract_string(body: &Value, key: &str) -> Option<String> {
    let candidates = [body.get(key), body.get("data").and_then(|d| d.get(key))];
    for candidate in candidates {
        if let Some(s) = candidate.and_then(Value::as_str) {
            return Some(s.to_string());
        }
    }
    None
}
