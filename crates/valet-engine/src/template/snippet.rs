//! Snippet syntax normalizer.
//!
//! Operators sometimes paste request snippets shaped like
//!
//! ```text
//! const url = "https://park.example/api/discount?plate={{plate}}";
//! const method = "POST";
//! const headers = { 'Content-Type': 'application/json', };
//! const body = { plate: "{{plate}}", totalcount: 1 };
//! ```
//!
//! This module only turns that text into the JSON template document accepted
//! by [`RequestTemplate::from_document`](super::RequestTemplate::from_document);
//! it never builds requests itself.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

struct SnippetPatterns {
    url: Regex,
    method: Regex,
    body_type: Regex,
    headers: Regex,
    body_object: Regex,
    body_string: Regex,
}

static SNIPPET_PATTERNS: OnceLock<SnippetPatterns> = OnceLock::new();
static BARE_KEY_REGEX: OnceLock<Regex> = OnceLock::new();
static TRAILING_COMMA_REGEX: OnceLock<Regex> = OnceLock::new();

fn string_pattern(name: &str) -> Regex {
    Regex::new(&format!(
        r#"(?:const|let|var)\s+{name}\s*=\s*(?:"([^"]*)"|'([^']*)'|`([^`]*)`)\s*;?"#
    ))
    .unwrap()
}

fn object_pattern(name: &str) -> Regex {
    Regex::new(&format!(r"(?s)(?:const|let|var)\s+{name}\s*=\s*(\{{.*?\}})\s*;")).unwrap()
}

fn get_patterns() -> &'static SnippetPatterns {
    SNIPPET_PATTERNS.get_or_init(|| SnippetPatterns {
        url: string_pattern("url"),
        method: string_pattern("method"),
        body_type: string_pattern("bodyType"),
        headers: object_pattern("headers"),
        body_object: object_pattern("body"),
        body_string: string_pattern("body"),
    })
}

fn get_bare_key_regex() -> &'static Regex {
    BARE_KEY_REGEX
        .get_or_init(|| Regex::new(r"([{,]\s*)([A-Za-z_$][A-Za-z0-9_$-]*)\s*:").unwrap())
}

fn get_trailing_comma_regex() -> &'static Regex {
    TRAILING_COMMA_REGEX.get_or_init(|| Regex::new(r",\s*([}\]])").unwrap())
}

fn capture_string(re: &Regex, text: &str) -> Option<String> {
    let caps = re.captures(text)?;
    (1..=3)
        .find_map(|i| caps.get(i))
        .map(|m| m.as_str().to_string())
}

/// Parse a JavaScript-ish object literal into a JSON map.
///
/// Quotes are normalized to double quotes, bare keys are quoted and trailing
/// commas dropped. When that fails the text is tried as strict JSON.
pub fn parse_object_literal(text: &str) -> Option<Map<String, Value>> {
    let quoted = text.replace(['`', '\''], "\"");
    let keyed = get_bare_key_regex().replace_all(&quoted, "${1}\"${2}\":");
    let cleaned = get_trailing_comma_regex().replace_all(&keyed, "${1}");

    serde_json::from_str::<Map<String, Value>>(&cleaned)
        .ok()
        .or_else(|| serde_json::from_str::<Map<String, Value>>(text).ok())
}

/// Convert snippet text into a JSON template document.
///
/// Returns `None` when no `url` declaration is present.
pub fn normalize(text: &str) -> Option<Value> {
    let patterns = get_patterns();
    let url = capture_string(&patterns.url, text)?;

    let mut doc = Map::new();
    doc.insert("url".to_string(), Value::String(url));

    if let Some(method) = capture_string(&patterns.method, text) {
        doc.insert("method".to_string(), Value::String(method));
    }
    if let Some(body_type) = capture_string(&patterns.body_type, text) {
        doc.insert("bodyType".to_string(), Value::String(body_type));
    }
    if let Some(headers) = patterns
        .headers
        .captures(text)
        .and_then(|caps| parse_object_literal(&caps[1]))
    {
        doc.insert("headers".to_string(), Value::Object(headers));
    }

    let body = match patterns.body_object.captures(text) {
        Some(caps) => parse_object_literal(&caps[1]).map(Value::Object),
        None => capture_string(&patterns.body_string, text).map(Value::String),
    };
    if let Some(body) = body {
        doc.insert("body".to_string(), body);
    }

    Some(Value::Object(doc))
}
