//! Bounded, depth-limited stringification of untrusted values.
//!
//! Opaque payload fields (comparison records, trend rows, eligibility
//! details) are never serialised verbatim into a prompt.  They go through
//! [`safe_render`], which sanitises every string, caps list and map fan-out
//! and stops descending at a fixed depth, so the rendered size is bounded
//! regardless of how the payload is shaped.

use serde_json::Value;

use crate::sanitize::{sanitize, sanitize_value};

/// Token emitted in place of a container once the depth budget is spent.
pub const DEPTH_PLACEHOLDER: &str = "[...]";
/// Maximum list elements rendered.
pub const MAX_RENDERED_ITEMS: usize = 15;
/// Maximum map entries rendered.
pub const MAX_RENDERED_PAIRS: usize = 10;
/// Character cap applied to every rendered string value.
pub const RENDERED_STRING_CHARS: usize = 200;
/// Character cap applied to rendered map keys.
pub const RENDERED_KEY_CHARS: usize = 100;
/// Depth used by the prompt builder for opaque values.
pub const PROMPT_RENDER_DEPTH: usize = 3;

/// Render `value` as prompt text, descending at most `max_depth` container
/// levels.
pub fn safe_render(value: &Value, max_depth: usize) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(_) => sanitize_value(value, RENDERED_STRING_CHARS),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) if max_depth == 0 => DEPTH_PLACEHOLDER.to_string(),
        Value::Array(items) => items
            .iter()
            .take(MAX_RENDERED_ITEMS)
            .map(|item| safe_render(item, max_depth - 1))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .iter()
            .take(MAX_RENDERED_PAIRS)
            .map(|(k, v)| {
                format!(
                    "{}: {}",
                    sanitize(k, RENDERED_KEY_CHARS),
                    safe_render(v, max_depth - 1)
                )
            })
            .collect::<Vec<_>>()
            .join("; "),
    }
}

/// Render an already validated list of strings with the same caps as
/// [`safe_render`].
pub fn render_list(items: &[String]) -> String {
    items
        .iter()
        .take(MAX_RENDERED_ITEMS)
        .map(|s| sanitize(s, RENDERED_STRING_CHARS))
        .collect::<Vec<_>>()
        .join(", ")
}
