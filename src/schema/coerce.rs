//! Field-level coercion from loosely typed JSON.
//!
//! Every function here is total: any input, including `None`, maps to a value
//! of the target type.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Neutral midpoint on the 0–10 scale.
pub const NEUTRAL_SCORE: f64 = 5.0;
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// Keep a key that is present with a `null` value as `Some(Value::Null)`.
///
/// Paired with `#[serde(default)]`, an absent key stays `None`.
pub fn present<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(de).map(Some)
}

/// Numeric score on the 0–10 scale.
///
/// Accepts numbers and numeric strings ("7", "7.5", "7/10"). Finite values
/// are clamped into range; everything else is the neutral midpoint.
pub fn score(value: Option<&Value>) -> f64 {
    parse_number(value)
        .map(|n| n.clamp(MIN_SCORE, MAX_SCORE))
        .unwrap_or(NEUTRAL_SCORE)
}

/// Whether `value` carries a usable number under [`score`]'s rules.
pub fn is_numeric(value: Option<&Value>) -> bool {
    parse_number(value).is_some()
}

fn parse_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let head = s.trim().split('/').next()?.trim();
            head.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Free text. Numbers and booleans are rendered; anything else is empty.
pub fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Free text that stays absent when empty.
pub fn optional_text(value: Option<&Value>) -> Option<String> {
    Some(text(value)).filter(|s| !s.is_empty())
}

/// First non-empty text among several candidate keys of an object.
pub fn text_from(map: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .map(|k| text(map.get(*k)))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// A list of strings. A bare string becomes a one-element list; objects
/// inside the list contribute their most text-like field.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(list_item_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn list_item_text(item: &Value) -> String {
    match item {
        Value::Object(map) => {
            let found = text_from(map, &["text", "step", "thought", "reasoning", "point", "content"]);
            if found.is_empty() {
                Value::Object(map.clone()).to_string()
            } else {
                found
            }
        }
        other => text(Some(other)),
    }
}

/// Object elements of a list; non-object elements are skipped.
pub fn records(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

/// Positive integer priority, or `fallback` when missing or invalid.
pub fn priority(value: Option<&Value>, fallback: u32) -> u32 {
    parse_number(value)
        .filter(|n| *n >= 1.0 && *n <= u32::MAX as f64)
        .map(|n| n.round() as u32)
        .unwrap_or(fallback)
}
