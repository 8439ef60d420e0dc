//! Extraction and repair of JSON emitted by the language model.
//!
//! Replies are expected to hold one JSON object but regularly arrive wrapped
//! in a markdown fence, surrounded by prose, or cut off when the model hits
//! its output budget.  [`parse_model_json`] strips the fence, isolates the
//! object and runs a heuristic repair pass before parsing.  The repair
//! prefers a partial but valid document over failure: a trailing incomplete
//! field is dropped and every open container is closed.

use memchr::memchr;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

static OPENING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*").unwrap());
static PARTIAL_UNICODE_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\u[0-9A-Fa-f]{0,3}$").unwrap());

/// The reply could not be coerced into JSON.  `raw` keeps the untouched
/// model output for diagnostics and must never be shown to end users.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("model reply is not valid JSON after repair: {reason}")]
pub struct ParseError {
    pub reason: String,
    pub raw: String,
}

impl ParseError {
    pub fn new(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

/// Remove a leading markdown fence (with optional language tag) and a
/// trailing fence.  Both are independent: either may be absent.
pub fn strip_code_fence(text: &str) -> &str {
    let mut t = text.trim();
    if let Some(m) = OPENING_FENCE.find(t) {
        t = &t[m.end()..];
    }
    let trimmed = t.trim_end();
    if let Some(rest) = trimmed.strip_suffix("```") {
        t = rest;
    }
    t.trim()
}

/// Isolate the first JSON object in `text`.
///
/// The slice starts at the first `{`.  When that object closes, the slice
/// ends at its matching `}` so trailing commentary is discarded.  When it
/// never closes the reply was truncated and everything up to end-of-text is
/// kept for the repair pass.  Text without any `{` is returned unchanged.
pub fn extract_object(text: &str) -> &str {
    let start = match memchr(b'{', text.as_bytes()) {
        Some(idx) => idx,
        None => return text,
    };
    let candidate = &text[start..];
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;
    for (i, c) in candidate.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match c {
            '\\' => escape = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &candidate[..=i];
                }
            }
            _ => {}
        }
    }
    candidate
}

/// Structural state at the end of a scan.
struct ScanState {
    in_string: bool,
    escape_pending: bool,
    string_start: usize,
    open: Vec<char>,
}

fn scan(text: &str) -> ScanState {
    let mut state = ScanState {
        in_string: false,
        escape_pending: false,
        string_start: 0,
        open: Vec::new(),
    };
    for (i, c) in text.char_indices() {
        if state.escape_pending {
            state.escape_pending = false;
            continue;
        }
        if c == '\\' {
            state.escape_pending = true;
            continue;
        }
        if c == '"' {
            if !state.in_string {
                state.string_start = i;
            }
            state.in_string = !state.in_string;
            continue;
        }
        if state.in_string {
            continue;
        }
        match c {
            '{' | '[' => state.open.push(c),
            '}' if state.open.last() == Some(&'{') => {
                state.open.pop();
            }
            ']' if state.open.last() == Some(&'[') => {
                state.open.pop();
            }
            _ => {}
        }
    }
    state
}

/// Heuristically restore structural validity to possibly truncated JSON.
///
/// 1. An unterminated string that follows a `,` (or opens an object) is a
///    dangling fragment and is dropped; any other unterminated string value
///    is closed, keeping its partial text.
/// 2. Trailing commas, dangling keys (with or without their `:`) and
///    incomplete bare literals are removed.
/// 3. Open brackets and braces are closed in reverse order of opening.
pub fn repair_truncated_json(text: &str) -> String {
    let state = scan(text);
    let mut out = text.to_string();

    if state.in_string {
        if state.escape_pending {
            out.pop();
        }
        if let Some(m) = PARTIAL_UNICODE_ESCAPE.find(&out[state.string_start..]) {
            let cut = state.string_start + m.start();
            // `\\u` is an escaped backslash followed by a plain `u`.
            if !is_escaped(out.as_bytes(), cut) {
                out.truncate(cut);
            }
        }
        let before = out[..state.string_start].trim_end();
        match before.chars().last() {
            Some(',') => {
                let keep = before.len() - 1;
                out.truncate(keep);
            }
            Some('{') => {
                let keep = before.len();
                out.truncate(keep);
            }
            _ => out.push('"'),
        }
    }

    let inside_object = state.open.last() == Some(&'{');
    loop {
        let len = out.trim_end().len();
        out.truncate(len);
        if out.ends_with(',') {
            out.pop();
            continue;
        }
        if out.ends_with(':') {
            out.pop();
            let len = out.trim_end().len();
            out.truncate(len);
            if !drop_trailing_string(&mut out) {
                break;
            }
            continue;
        }
        if inside_object && ends_with_dangling_key(&out) {
            drop_trailing_string(&mut out);
            continue;
        }
        if !state.open.is_empty() && drop_incomplete_literal(&mut out) {
            continue;
        }
        break;
    }

    for opener in state.open.iter().rev() {
        out.push(if *opener == '{' { '}' } else { ']' });
    }
    out
}

/// Whether the byte at `idx` is preceded by an odd run of backslashes.
fn is_escaped(bytes: &[u8], idx: usize) -> bool {
    let backslashes = bytes[..idx].iter().rev().take_while(|b| **b == b'\\').count();
    backslashes % 2 == 1
}

/// Byte offset of the opening quote of the string literal that ends `text`.
fn trailing_string_start(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.last() != Some(&b'"') || bytes.len() < 2 {
        return None;
    }
    let mut j = bytes.len() - 1;
    while j > 0 {
        j -= 1;
        if bytes[j] == b'"' && !is_escaped(bytes, j) {
            return Some(j);
        }
    }
    None
}

fn drop_trailing_string(out: &mut String) -> bool {
    match trailing_string_start(out) {
        Some(start) => {
            out.truncate(start);
            true
        }
        None => false,
    }
}

/// A string in object context directly after `{` or `,` is a key with no
/// value.
fn ends_with_dangling_key(text: &str) -> bool {
    match trailing_string_start(text) {
        Some(start) => matches!(text[..start].trim_end().chars().last(), Some('{') | Some(',')),
        None => false,
    }
}

/// Drop a trailing bare token (`tru`, `1.`, `-`) that is not a complete JSON
/// literal.  Returns true when something was removed.
fn drop_incomplete_literal(out: &mut String) -> bool {
    let is_token_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+');
    let start = out
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_token_char(*c))
        .last()
        .map(|(i, _)| i);
    let start = match start {
        Some(s) => s,
        None => return false,
    };
    if serde_json::from_str::<Value>(&out[start..]).is_ok() {
        return false;
    }
    out.truncate(start);
    true
}

/// Strip fencing, isolate the object, repair it and parse.
pub fn parse_model_json(raw: &str) -> Result<Value, ParseError> {
    let unfenced = strip_code_fence(raw);
    let candidate = extract_object(unfenced);
    let repaired = repair_truncated_json(candidate);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => {
            if repaired != candidate {
                tracing::debug!(
                    raw_len = raw.len(),
                    repaired_len = repaired.len(),
                    "repaired truncated model JSON"
                );
            }
            Ok(value)
        }
        Err(err) => Err(ParseError::new(err.to_string(), raw)),
    }
}
