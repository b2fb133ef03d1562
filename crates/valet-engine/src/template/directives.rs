//! `#body{...}` and `#header{...}` override directives.
//!
//! Directives may be embedded in a discount type's template text or in a
//! guest's free-text note. Template directives are applied when the template
//! is parsed; note directives are applied afterwards, on top, so the note wins.

use super::snippet::parse_object_literal;
use super::tokens::token_ranges;
use super::types::{BodyType, HeaderList, RequestTemplate, TemplateBody};
use crate::value::js_string;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

static BODY_DIRECTIVE_REGEX: OnceLock<Regex> = OnceLock::new();
static HEADER_DIRECTIVE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_body_directive_regex() -> &'static Regex {
    BODY_DIRECTIVE_REGEX.get_or_init(|| Regex::new(r"(?s)#body\{(.*?)\}").unwrap())
}

fn get_header_directive_regex() -> &'static Regex {
    HEADER_DIRECTIVE_REGEX.get_or_init(|| Regex::new(r"(?s)#header\{(.*?)\}").unwrap())
}

/// Directive blocks collected from a piece of text, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    pub headers: Vec<String>,
    pub bodies: Vec<String>,
}

impl Directives {
    /// Collect every directive in `text` and return them with the text that
    /// remains once they are stripped.
    pub fn extract(text: &str) -> (Self, String) {
        let headers = get_header_directive_regex()
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .collect();
        let bodies = get_body_directive_regex()
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .collect();

        let without_headers = get_header_directive_regex().replace_all(text, "");
        let remainder = get_body_directive_regex()
            .replace_all(&without_headers, "")
            .into_owned();

        (Self { headers, bodies }, remainder)
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.bodies.is_empty()
    }

    /// Apply header then body directives to a template.
    pub fn apply(&self, template: &mut RequestTemplate) {
        self.apply_headers(&mut template.headers);
        for content in &self.bodies {
            apply_body_directive(template, content);
        }
    }

    /// Merge header directives onto a header list, case-insensitively.
    pub fn apply_headers(&self, headers: &mut HeaderList) {
        for content in &self.headers {
            headers.merge(parse_overrides(content));
        }
    }
}

/// Split `k=v` / `k:v` pairs separated by `&`, `;` or newlines.
///
/// Each pair splits at whichever of `=` or `:` comes first. Pairs without a
/// separator or with an empty key are dropped.
pub fn parse_pairs(text: &str) -> Vec<(String, String)> {
    text.split(['&', ';', '\n', '\r'])
        .filter_map(|part| {
            let part = part.trim();
            let idx = part.find(['=', ':'])?;
            let key = part[..idx].trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), part[idx + 1..].trim().to_string()))
        })
        .collect()
}

/// Parse directive content as key/value overrides.
///
/// Content that looks like an object literal (starts with `{` or a quoted
/// key) is parsed as one; everything else goes through [`parse_pairs`].
pub fn parse_overrides(content: &str) -> Vec<(String, String)> {
    let trimmed = content.trim();
    let literal = if trimmed.starts_with('{') {
        // The directive regex stops at the first `}`, so a literal arrives unclosed.
        parse_object_literal(trimmed).or_else(|| parse_object_literal(&format!("{trimmed}}}")))
    } else if trimmed.starts_with(['"', '\'']) {
        parse_object_literal(&format!("{{{trimmed}}}"))
    } else {
        None
    };

    match literal {
        Some(map) => map
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k, js_string(&v)))
            .collect(),
        None => parse_pairs(trimmed),
    }
}

fn apply_body_directive(template: &mut RequestTemplate, content: &str) {
    let overrides = parse_overrides(content);

    match template.body.take() {
        Some(TemplateBody::Fields(mut fields)) => {
            for (key, value) in overrides {
                fields.insert(key, Value::String(value));
            }
            template.body = Some(TemplateBody::Fields(fields));
        }
        Some(TemplateBody::Text(text)) if !text.is_empty() && !overrides.is_empty() => {
            template.body = Some(TemplateBody::Text(set_encoded_params(&text, &overrides)));
            template.body_type.get_or_insert(BodyType::Form);
        }
        _ => {
            template.body = Some(TemplateBody::Text(content.trim().to_string()));
            template.body_type = Some(BodyType::Raw);
        }
    }
}

/// Set parameters on an already URL-encoded string, replacing any existing
/// value for the same key. Substitution tokens are written back verbatim.
pub fn set_encoded_params(encoded: &str, overrides: &[(String, String)]) -> String {
    let source = encoded.strip_prefix('?').unwrap_or(encoded);
    let mut params: Vec<(String, String)> = url::form_urlencoded::parse(source.as_bytes())
        .into_owned()
        .collect();

    for (key, value) in overrides {
        match params.iter().position(|(k, _)| k == key) {
            Some(first) => {
                params[first].1 = value.clone();
                let mut index = 0;
                params.retain(|(k, _)| {
                    let keep = index <= first || k != key;
                    index += 1;
                    keep
                });
            }
            None => params.push((key.clone(), value.clone())),
        }
    }

    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_keeping_tokens(k), encode_keeping_tokens(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_keeping_tokens(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for range in token_ranges(s) {
        out.extend(url::form_urlencoded::byte_serialize(s[last..range.start].as_bytes()));
        out.push_str(&s[range.clone()]);
        last = range.end;
    }
    out.extend(url::form_urlencoded::byte_serialize(s[last..].as_bytes()));
    out
}

/// A guest note split into directives, cleaned text and variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteOverrides {
    pub directives: Directives,
    /// The note with directive blocks removed, trimmed.
    pub cleaned: String,
    /// Variables parsed from the cleaned note, in order.
    pub variables: Vec<(String, String)>,
}

/// Parse a guest note.
///
/// After stripping directives, a remainder starting with `{` is read as a JSON
/// object of scalar values; anything else as `k=v` pairs.
pub fn parse_note(note: &str) -> NoteOverrides {
    let (directives, remainder) = Directives::extract(note);
    let cleaned = remainder.trim().to_string();

    let variables = if cleaned.starts_with('{') {
        serde_json::from_str::<serde_json::Map<String, Value>>(&cleaned)
            .map(|map| {
                map.into_iter()
                    .filter(|(_, v)| v.is_string() || v.is_number() || v.is_boolean())
                    .map(|(k, v)| (k, js_string(&v)))
                    .collect()
            })
            .unwrap_or_default()
    } else {
        parse_pairs(&cleaned)
    };

    NoteOverrides {
        directives,
        cleaned,
        variables,
    }
}
