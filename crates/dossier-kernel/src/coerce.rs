//! Tolerant coercion over untrusted JSON.
//!
//! Artifacts are written by an external process and any nested field may
//! have the wrong type. Rules and sections read fields only through these
//! helpers: a non-list reads as an empty list, a non-object as an empty
//! object, and a non-numeric value as absent.

use serde_json::{Map, Value};
use std::sync::OnceLock;

fn empty_map() -> &'static Map<String, Value> {
    static EMPTY: OnceLock<Map<String, Value>> = OnceLock::new();
    EMPTY.get_or_init(Map::new)
}

/// The value as a slice of elements, or an empty slice.
pub fn as_list(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// The object elements of a list; non-objects are skipped.
pub fn objects(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    as_list(value).iter().filter_map(Value::as_object)
}

/// The value as an object, or a shared empty object.
pub fn as_dict(value: Option<&Value>) -> &Map<String, Value> {
    match value.and_then(Value::as_object) {
        Some(map) => map,
        None => empty_map(),
    }
}

/// A finite JSON number. Booleans and strings are not numbers.
pub fn as_finite_number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|n| n.is_finite())
}

/// A finite JSON number, falling back to `default`.
pub fn number_or(value: Option<&Value>, default: f64) -> f64 {
    as_finite_number(value).unwrap_or(default)
}

/// A finite number given either as a JSON number or a numeric string.
pub fn as_numeric_lenient(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        other => as_finite_number(other),
    }
}

/// The value as a string slice.
pub fn as_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str)
}

/// The value as a string slice, falling back to `default` when absent or
/// not a string.
pub fn str_or<'a>(value: Option<&'a Value>, default: &'a str) -> &'a str {
    as_str(value).unwrap_or(default)
}

/// A non-empty string after trimming.
pub fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    as_str(value).filter(|s| !s.trim().is_empty())
}

/// JSON truthiness: `false`, `null`, `0`, and empty strings, arrays and
/// objects are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Truthiness of an optional field; absent is falsy.
pub fn truthy(value: Option<&Value>) -> bool {
    value.is_some_and(is_truthy)
}

/// Exactly the JSON literal `true`.
pub fn is_true(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Bool(true)))
}

/// Canonical form for categorical comparison: trimmed, lowercase, with
/// `-` and spaces folded to `_`.
pub fn normalize_category(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

/// Normalized category of a string field; empty when absent.
pub fn category(value: Option<&Value>) -> String {
    as_str(value).map(normalize_category).unwrap_or_default()
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn normalize_ws(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
