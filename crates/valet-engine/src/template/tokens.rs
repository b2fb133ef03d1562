//! `{{name}}` token substitution.
//!
//! Substitution is total: unknown, `null` or unresolvable tokens become the
//! empty string instead of failing the request.

use crate::context::TemplateContext;
use crate::value::{js_string, normalize_path};
use regex::Regex;
use serde_json::Value;
use std::ops::Range;
use std::sync::OnceLock;

/// Regex for matching `{{name}}` tokens, allowing inner whitespace.
static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

/// Legacy `#{name}` spelling.
static LEGACY_TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_token_regex() -> &'static Regex {
    TOKEN_REGEX.get_or_init(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").unwrap())
}

fn get_legacy_token_regex() -> &'static Regex {
    LEGACY_TOKEN_REGEX.get_or_init(|| Regex::new(r"#\{([^{}]*)\}").unwrap())
}

/// Resolve a single token name to its string value.
pub fn resolve_token(name: &str, context: &TemplateContext) -> String {
    let path = normalize_path(name.trim());
    match context.resolve(&path) {
        None | Some(Value::Null) => String::new(),
        Some(value) => js_string(value),
    }
}

/// Replace every token in a string.
pub fn substitute_str(template: &str, context: &TemplateContext) -> String {
    let rewritten = get_legacy_token_regex().replace_all(template, "{{${1}}}");
    get_token_regex()
        .replace_all(&rewritten, |caps: &regex::Captures| {
            resolve_token(&caps[1], context)
        })
        .into_owned()
}

/// Substitute tokens throughout a JSON value, preserving its shape.
///
/// Object keys are left untouched; non-string scalars pass through.
pub fn substitute(value: &Value, context: &TemplateContext) -> Value {
    match value {
        Value::String(s) => Value::String(substitute_str(s, context)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, context)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Byte ranges of every `{{name}}` and `#{name}` token in a string, in order.
pub fn token_ranges(s: &str) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = get_token_regex()
        .find_iter(s)
        .chain(get_legacy_token_regex().find_iter(s))
        .map(|m| m.range())
        .collect();
    ranges.sort_by_key(|r| r.start);

    let mut end = 0;
    ranges.retain(|r| {
        let keep = r.start >= end;
        if keep {
            end = r.end;
        }
        keep
    });
    ranges
}
