//! Query-string assembly.
//!
//! Pairs are joined as `key=value` with `&` and are not percent-encoded.
//! String values are rendered without JSON quotes and arrays as comma lists.

use serde_json::Value;

use crate::config::Params;

pub fn encode(params: &Params) -> String {
    match params {
        Params::Raw(raw) => raw.clone(),
        Params::Pairs(pairs) => pairs
            .iter()
            .map(|(key, value)| format!("{key}={}", render(value)))
            .collect::<Vec<_>>()
            .join("&"),
    }
}

/// Append `params` to `url`, using `&` when `url` already has a query.
pub fn append_params(url: &str, params: &Params) -> String {
    let query = encode(params);
    if query.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

/// Render a value the way string interpolation would: arrays join their
/// elements with `,`, a `null` element renders empty, objects collapse to
/// `[object Object]`.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                item => render(item),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
        other => other.to_string(),
    }
}
