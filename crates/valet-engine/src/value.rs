//! Loose value helpers shared by templating and response evaluation.
//!
//! Admin-authored configs compare and print JSON values the way a browser
//! would: numbers without a trailing `.0`, `null` as `"null"`, arrays joined by
//! commas. These helpers keep that behavior in one place.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

static INDEX_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_index_regex() -> &'static Regex {
    INDEX_REGEX.get_or_init(|| Regex::new(r"\[(\d+)\]").unwrap())
}

/// Rewrite `a[0].b` into `a.0.b`.
pub fn normalize_path(path: &str) -> String {
    get_index_regex().replace_all(path, ".$1").to_string()
}

/// Walk a dot path (`info.errmsg`, `items[0].id`) into a JSON value.
///
/// Objects are indexed by key, arrays by numeric segment. Empty segments are
/// skipped, so a leading `$.` or a doubled dot is tolerated.
pub fn value_at_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let normalized = normalize_path(path);
    let segments = normalized
        .trim_start_matches('$')
        .split('.')
        .filter(|s| !s.is_empty());
    walk(root, segments)
}

pub(crate) fn walk<'a, 'b>(
    root: &'a Value,
    segments: impl IntoIterator<Item = &'b str>,
) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// String form of a value, as `String(value)` would print it.
pub fn js_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn format_number(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy; containers never are.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Loose equality used by `success.equals`: strict equality of scalars, or
/// equality of their string forms. A missing value prints as `undefined`.
pub fn loose_equals(actual: Option<&Value>, expected: &Value) -> bool {
    let strict = match actual {
        Some(a) if !a.is_object() && !a.is_array() => a == expected,
        _ => false,
    };
    if strict {
        return true;
    }
    let actual_str = actual
        .map(js_string)
        .unwrap_or_else(|| "undefined".to_string());
    actual_str == js_string(expected)
}
