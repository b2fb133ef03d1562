//! Lenient JSON parsing for upstream responses.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Regex for JSONP wrappers such as `callback({...});`
static JSONP_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_jsonp_regex() -> &'static Regex {
    JSONP_REGEX
        .get_or_init(|| Regex::new(r"(?s)^\s*[A-Za-z_$][\w$.]*\s*\((.*)\)\s*;?\s*$").unwrap())
}

/// Parse a response body as JSON, tolerating JSONP wrappers and surrounding noise.
///
/// Tries, in order: the whole text, the inside of an `identifier(...)` wrapper,
/// and the slice between the first `{` and the last `}`.
pub fn parse_lenient(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }

    if let Some(caps) = get_jsonp_regex().captures(text) {
        if let Ok(value) = serde_json::from_str::<Value>(caps[1].trim()) {
            return Some(value);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        assert_eq!(parse_lenient(r#"{"a":1}"#), Some(json!({"a": 1})));
        assert_eq!(parse_lenient("42"), Some(json!(42)));
    }

    #[test]
    fn test_jsonp_wrapper() {
        assert_eq!(parse_lenient(r#"cb({"a":1})"#), Some(json!({"a": 1})));
        assert_eq!(
            parse_lenient("  jQuery123.done( {\"ok\": true} );\n"),
            Some(json!({"ok": true}))
        );
    }

    #[test]
    fn test_embedded_object() {
        let html = r#"<html><script>var data = {"info": {"errmsg": "ok"}};</script></html>"#;
        assert_eq!(
            parse_lenient(html),
            Some(json!({"info": {"errmsg": "ok"}}))
        );
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_lenient("<html>error</html>"), None);
        assert_eq!(parse_lenient("} oops {"), None);
        assert_eq!(parse_lenient(""), None);
    }
}
