//! Request template parsing.
//!
//! A template is either a JSON document or snippet text (see [`super::snippet`]),
//! optionally carrying `#body{}` / `#header{}` directives anywhere in the text.

use super::directives::Directives;
use super::snippet;
use super::types::RequestTemplate;
use tracing::debug;

/// Parse raw template text.
///
/// Returns `None` when the text is neither a JSON template with a non-empty
/// `url` nor a snippet declaring one. A `None` here is a configuration error
/// for the caller, never a cue to fall back to another mode.
pub fn parse_template(raw: &str) -> Option<RequestTemplate> {
    let (directives, remainder) = Directives::extract(raw);
    let trimmed = remainder.trim();

    let doc = if trimmed.starts_with('{') {
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(doc) => doc,
            Err(e) => {
                debug!("Request template is not valid JSON: {}", e);
                return None;
            }
        }
    } else {
        snippet::normalize(trimmed)?
    };

    let mut template = RequestTemplate::from_document(&doc)?;
    directives.apply(&mut template);
    Some(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{BodyType, TemplateBody};
    use serde_json::json;

    #[test]
    fn test_parse_json_template() {
        let template =
            parse_template(r#"{"url":"https://x/y?p={{plate}}","method":"GET"}"#).unwrap();
        assert_eq!(template.url, "https://x/y?p={{plate}}");
        assert_eq!(template.method(), "GET");
        assert_eq!(template.body, None);
    }

    #[test]
    fn test_parse_json_without_url_is_invalid() {
        assert!(parse_template(r#"{"method":"GET"}"#).is_none());
        assert!(parse_template(r#"{"url": ""}"#).is_none());
        assert!(parse_template(r#"{"url": "https://x""#).is_none());
    }

    #[test]
    fn test_parse_unrecognized_text_is_invalid() {
        assert!(parse_template("please call the parking office").is_none());
        assert!(parse_template("").is_none());
        assert!(parse_template("#body{a=1}").is_none());
    }

    #[test]
    fn test_parse_snippet_template() {
        let raw = r#"
            const url = "https://park/apply";
            const body = "plate={{plate}}&count=1";
        "#;
        let template = parse_template(raw).unwrap();
        assert_eq!(template.method(), "POST");
        assert_eq!(template.body_type(), BodyType::Form);
        assert_eq!(
            template.body,
            Some(TemplateBody::Text("plate={{plate}}&count=1".into()))
        );
    }

    #[test]
    fn test_template_directives_applied_after_parse() {
        let raw = r#"{"url":"https://x","body":{"totalcount":"1"}} #body{adposid=5} #header{X-Src: desk}"#;
        let template = parse_template(raw).unwrap();
        assert_eq!(
            serde_json::to_value(&template.body).unwrap(),
            json!({"totalcount": "1", "adposid": "5"})
        );
        assert_eq!(template.headers.get("x-src"), Some("desk"));
        assert_eq!(template.body_type(), BodyType::Form);
    }

    #[test]
    fn test_explicit_json_body_type() {
        let raw = r#"{"url":"https://x","bodyType":"JSON","body":{"a":"{{plate}}"}}"#;
        let template = parse_template(raw).unwrap();
        assert_eq!(template.body_type(), BodyType::Json);
    }
}
