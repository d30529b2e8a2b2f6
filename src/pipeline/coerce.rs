//! Shape enforcement with graceful degradation.
//!
//! Every step returns a [`Coerced`] so the truncation, padding and filtering
//! applied to a payload stays visible to the caller and to tests.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::exchange::ValidationOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoercionNote {
    Truncated { from: usize, to: usize },
    PaddedCycling { from: usize, to: usize },
    PaddedDummy { from: usize, to: usize },
    OptionsTruncated { index: usize, from: usize, to: usize },
    Dropped { index: usize, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Coerced<T> {
    Valid(T),
    Coerced(T, Vec<CoercionNote>),
    Rejected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("Payload is not a JSON object")]
    NotAnObject,
    #[error("Payload is missing keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),
    #[error("Payload rejected: {0}")]
    Rejected(String),
}

impl<T> Coerced<T> {
    pub fn with_notes(value: T, notes: Vec<CoercionNote>) -> Self {
        if notes.is_empty() {
            Coerced::Valid(value)
        } else {
            Coerced::Coerced(value, notes)
        }
    }

    pub fn outcome(&self) -> ValidationOutcome {
        match self {
            Coerced::Valid(_) => ValidationOutcome::Valid,
            Coerced::Coerced(..) => ValidationOutcome::Coerced,
            Coerced::Rejected(_) => ValidationOutcome::Failed,
        }
    }

    pub fn notes(&self) -> &[CoercionNote] {
        match self {
            Coerced::Coerced(_, notes) => notes,
            _ => &[],
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            Coerced::Valid(v) | Coerced::Coerced(v, _) => Some(v),
            Coerced::Rejected(_) => None,
        }
    }

    pub fn into_result(self) -> Result<(T, Vec<CoercionNote>), ValidationFailure> {
        match self {
            Coerced::Valid(v) => Ok((v, Vec::new())),
            Coerced::Coerced(v, notes) => Ok((v, notes)),
            Coerced::Rejected(reason) => Err(ValidationFailure::Rejected(reason)),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Coerced<U> {
        match self {
            Coerced::Valid(v) => Coerced::Valid(f(v)),
            Coerced::Coerced(v, notes) => Coerced::Coerced(f(v), notes),
            Coerced::Rejected(reason) => Coerced::Rejected(reason),
        }
    }

    /// Chain another step, carrying earlier notes forward.
    pub fn and_then<U, F: FnOnce(T) -> Coerced<U>>(self, f: F) -> Coerced<U> {
        let (value, mut notes) = match self {
            Coerced::Valid(v) => (v, Vec::new()),
            Coerced::Coerced(v, notes) => (v, notes),
            Coerced::Rejected(reason) => return Coerced::Rejected(reason),
        };
        match f(value) {
            Coerced::Valid(u) => Coerced::with_notes(u, notes),
            Coerced::Coerced(u, more) => {
                notes.extend(more);
                Coerced::Coerced(u, notes)
            }
            Coerced::Rejected(reason) => Coerced::Rejected(reason),
        }
    }
}

impl<T> From<ValidationFailure> for Coerced<T> {
    fn from(failure: ValidationFailure) -> Self {
        Coerced::Rejected(failure.to_string())
    }
}

/// A question whose answer must be one of its own options.
pub trait Answerable {
    fn options(&self) -> &[String];
    fn options_mut(&mut self) -> &mut Vec<String>;
    fn answer(&self) -> &str;

    fn is_answerable(&self) -> bool {
        self.options().iter().any(|o| o == self.answer())
    }
}

pub fn require_keys(value: &Value, keys: &[&str]) -> Result<(), ValidationFailure> {
    let object = value.as_object().ok_or(ValidationFailure::NotAnObject)?;
    let missing: Vec<String> = keys
        .iter()
        .filter(|k| !object.contains_key(**k))
        .map(|k| k.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure::MissingKeys(missing))
    }
}

/// The array under `key`, or the value itself when it already is an array.
pub fn array_at<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    value.get(key).and_then(Value::as_array).or_else(|| value.as_array())
}

/// Deserialize each entry, dropping the ones that do not fit `T`.
pub fn parse_items<T: DeserializeOwned>(values: &[Value]) -> Coerced<Vec<T>> {
    let mut items = Vec::with_capacity(values.len());
    let mut notes = Vec::new();
    for (index, value) in values.iter().enumerate() {
        match serde_json::from_value::<T>(value.clone()) {
            Ok(item) => items.push(item),
            Err(e) => notes.push(CoercionNote::Dropped {
                index,
                reason: e.to_string(),
            }),
        }
    }
    Coerced::with_notes(items, notes)
}

pub fn truncate<T>(mut items: Vec<T>, n: usize) -> Coerced<Vec<T>> {
    let from = items.len();
    if from <= n {
        return Coerced::Valid(items);
    }
    items.truncate(n);
    Coerced::Coerced(items, vec![CoercionNote::Truncated { from, to: n }])
}

/// Repeat existing entries in order until there are `n`. The originals keep
/// their positions at the front.
pub fn pad_cycling<T: Clone>(mut items: Vec<T>, n: usize) -> Coerced<Vec<T>> {
    let from = items.len();
    if from >= n {
        return Coerced::Valid(items);
    }
    if from == 0 {
        return Coerced::Rejected("no entries to cycle".to_string());
    }
    for i in 0..(n - from) {
        let next = items[i % from].clone();
        items.push(next);
    }
    Coerced::Coerced(items, vec![CoercionNote::PaddedCycling { from, to: n }])
}

/// Append copies of `dummy` until there are `n` entries.
pub fn pad_with_dummy<T: Clone>(mut items: Vec<T>, n: usize, dummy: &T) -> Coerced<Vec<T>> {
    let from = items.len();
    if from >= n {
        return Coerced::Valid(items);
    }
    items.resize(n, dummy.clone());
    Coerced::Coerced(items, vec![CoercionNote::PaddedDummy { from, to: n }])
}

/// Cut option lists longer than `max`. Shorter lists are left alone.
pub fn cap_options<T: Answerable>(mut items: Vec<T>, max: usize) -> Coerced<Vec<T>> {
    let mut notes = Vec::new();
    for (index, item) in items.iter_mut().enumerate() {
        let from = item.options().len();
        if from > max {
            item.options_mut().truncate(max);
            notes.push(CoercionNote::OptionsTruncated { index, from, to: max });
        }
    }
    Coerced::with_notes(items, notes)
}

/// Drop every entry whose answer is not among its options.
pub fn retain_answerable<T: Answerable>(items: Vec<T>) -> Coerced<Vec<T>> {
    let mut kept = Vec::with_capacity(items.len());
    let mut notes = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        if item.is_answerable() {
            kept.push(item);
        } else {
            notes.push(CoercionNote::Dropped {
                index,
                reason: format!("answer {:?} is not among the options", item.answer()),
            });
        }
    }
    Coerced::with_notes(kept, notes)
}

pub fn non_empty<T>(items: Vec<T>, what: &str) -> Coerced<Vec<T>> {
    if items.is_empty() {
        Coerced::Rejected(format!("no usable {}", what))
    } else {
        Coerced::Valid(items)
    }
}
