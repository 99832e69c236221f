//! Pull a JSON payload out of free-form model output.
//!
//! Model responses may wrap the JSON in code fences or surround it with
//! prose. Extraction strips fence markers, then slices from the first `[` or
//! `{` to the last matching `]` or `}` and parses that.

use serde_json::Value;
use thiserror::Error;

/// Why a response could not be turned into JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("response is empty")]
    Empty,
    #[error("no JSON array or object found")]
    NoJson,
    #[error("invalid JSON: {0}")]
    Invalid(String),
}

/// Remove Markdown code fence lines (```` ``` ```` / ```` ```json ````).
pub fn strip_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract and parse the JSON value embedded in `text`.
pub fn extract_json(text: &str) -> Result<Value, ParseError> {
    let stripped = strip_fences(text);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let start = trimmed.find(['[', '{']).ok_or(ParseError::NoJson)?;
    let close = if trimmed[start..].starts_with('[') { ']' } else { '}' };
    let end = trimmed.rfind(close).ok_or(ParseError::NoJson)?;
    if end < start {
        return Err(ParseError::NoJson);
    }

    serde_json::from_str(&trimmed[start..=end]).map_err(|e| ParseError::Invalid(e.to_string()))
}

/// Extract a JSON object, rejecting arrays and scalars.
pub fn extract_object(text: &str) -> Result<serde_json::Map<String, Value>, ParseError> {
    match extract_json(text)? {
        Value::Object(map) => Ok(map),
        // An array holding one object is accepted too
        Value::Array(mut items) if items.len() == 1 && items[0].is_object() => {
            match items.remove(0) {
                Value::Object(map) => Ok(map),
                _ => Err(ParseError::NoJson),
            }
        }
        _ => Err(ParseError::Invalid("expected a JSON object".to_string())),
    }
}
