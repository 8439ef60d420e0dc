//! Prompt-input sanitisation.
//!
//! Every caller-supplied scalar passes through [`sanitize`] before it is
//! interpolated into a prompt.  The transformation is intentionally narrow:
//! fenced code markers and angle brackets are stripped, long runs of blank
//! lines collapse, and the result is hard-capped.  It reduces the surface for
//! prompt-structure injection; it does not make arbitrary input safe.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::util::truncate_chars;

static NEWLINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Sanitise free text for prompt interpolation.  `max_chars` is the hard
/// output cap; callers pass twice the validator's field limit.
pub fn sanitize(text: &str, max_chars: usize) -> String {
    let without_fences = text.replace("```", "");
    let collapsed = NEWLINE_RUNS.replace_all(&without_fences, "\n\n");
    let stripped: String = collapsed.chars().filter(|c| *c != '<' && *c != '>').collect();
    truncate_chars(stripped.trim(), max_chars).to_string()
}

/// Sanitise an untyped value.  Anything other than a JSON string yields an
/// empty string.
pub fn sanitize_value(value: &Value, max_chars: usize) -> String {
    match value {
        Value::String(s) => sanitize(s, max_chars),
        _ => String::new(),
    }
}
