//! Recover a JSON payload from free-form model text.
//!
//! Models wrap JSON in prose or code fences. The span from the first opening
//! bracket to the last closing one is parsed; when several objects are present
//! the union span is tried as-is and usually fails. A missing or unparsable
//! span yields `None`, never an error.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extractor {
    /// First `{` to last `}`.
    #[default]
    Braces,
    /// Greedy `{...}` regex match; same span as `Braces`.
    Regex,
    /// First `[` to last `]`.
    Array,
    /// `Braces`, then `Array` for replies that are a bare list.
    ObjectOrArray,
}

impl Extractor {
    pub fn extract(&self, text: &str) -> Option<Value> {
        match self {
            Extractor::Braces => extract_json(text),
            Extractor::Regex => extract_json_regex(text),
            Extractor::Array => extract_json_array(text),
            Extractor::ObjectOrArray => extract_json(text).or_else(|| extract_json_array(text)),
        }
    }
}

pub fn extract_json(text: &str) -> Option<Value> {
    span_between(text, '{', '}').and_then(parse)
}

pub fn extract_json_array(text: &str) -> Option<Value> {
    span_between(text, '[', ']').and_then(parse)
}

pub fn extract_json_regex(text: &str) -> Option<Value> {
    static OBJECT: OnceLock<Option<Regex>> = OnceLock::new();
    let regex = OBJECT.get_or_init(|| Regex::new(r"(?s)\{.*\}").ok()).as_ref()?;
    regex.find(text).and_then(|m| parse(m.as_str()))
}

fn span_between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}

fn parse(span: &str) -> Option<Value> {
    match serde_json::from_str(span) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, span_len = span.len(), "Candidate JSON span did not parse");
            None
        }
    }
}
