//! Turns templates into concrete outbound requests.

use crate::config::{LegacyConfig, LegacyRequest};
use crate::context::TemplateContext;
use crate::error::ConfigurationError;
use crate::template::{
    substitute, substitute_str, BodyType, HeaderList, RequestTemplate, TemplateBody,
};
use crate::value::js_string;
use serde::Serialize;
use serde_json::{Map, Value};

/// A fully resolved request, ready to send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedRequest {
    pub method: String,
    pub url: String,
    pub headers: HeaderList,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl PreparedRequest {
    /// Resolve a template against a context.
    ///
    /// Header values (not names), the URL and body contents are substituted.
    /// `Cookie` and `Referer` are injected from the context only when the
    /// template does not set them. `GET` requests never carry a body.
    pub fn from_template(template: &RequestTemplate, context: &TemplateContext) -> Self {
        let method = template.method();
        let url = substitute_str(&template.url, context);

        let mut headers = template.headers.clone();
        for value in headers.values_mut() {
            *value = substitute_str(value, context);
        }
        if !headers.contains("cookie") {
            if let Some(jsessionid) = context.get_str("jsessionid") {
                headers.set("Cookie", format!("JSESSIONID={jsessionid}"));
            }
        }
        if !headers.contains("referer") {
            if let Some(referer) = context.get_str("referer") {
                headers.set("Referer", referer);
            }
        }

        let body = if method == "GET" {
            None
        } else {
            let body_type = template.body_type();
            let body = template
                .body
                .as_ref()
                .map(|body| serialize_body(body, body_type, context));
            if body.is_some() && !headers.contains("content-type") {
                if let Some(content_type) = body_type.default_content_type() {
                    headers.set("Content-Type", content_type);
                }
            }
            body
        };

        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// Build the fixed legacy discount call.
    pub fn legacy(
        config: &LegacyConfig,
        request: &LegacyRequest,
        plate: &str,
    ) -> Result<Self, ConfigurationError> {
        let url = config
            .endpoint
            .clone()
            .ok_or(ConfigurationError::MissingLegacyEndpoint)?;

        let mut headers = HeaderList::new();
        headers.set(
            "Content-Type",
            BodyType::Form.default_content_type().unwrap_or_default(),
        );
        headers.set("Cookie", format!("JSESSIONID={}", request.jsessionid));
        if let Some(referer) = &request.referer_url {
            headers.set("Referer", referer.as_str());
        }

        let params = config.params_for(&request.post_params, plate);
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();

        Ok(Self {
            method: "POST".to_string(),
            url,
            headers,
            body: Some(body),
        })
    }
}

fn serialize_body(body: &TemplateBody, body_type: BodyType, context: &TemplateContext) -> String {
    match body {
        TemplateBody::Text(text) => substitute_str(text, context),
        TemplateBody::Fields(fields) => {
            let substituted = match substitute(&Value::Object(fields.clone()), context) {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            match body_type {
                BodyType::Form => encode_form(&substituted),
                BodyType::Json | BodyType::Raw => Value::Object(substituted).to_string(),
            }
        }
    }
}

/// URL-encode a field map; `null` values become empty strings.
pub fn encode_form(fields: &Map<String, Value>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        let value = match value {
            Value::Null => String::new(),
            other => js_string(other),
        };
        serializer.append_pair(key, &value);
    }
    serializer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::parse_template;
    use serde_json::json;

    fn context() -> TemplateContext {
        [
            ("plate", "粤B12345"),
            ("jsessionid", "SESS1"),
            ("referer", "https://park/ref"),
            ("vip", "1"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_get_url_substitution() {
        let template =
            parse_template(r#"{"url":"https://x/y?p={{plate}}","method":"GET"}"#).unwrap();
        let request = PreparedRequest::from_template(&template, &context());
        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "https://x/y?p=粤B12345");
        assert_eq!(request.body, None);
    }

    #[test]
    fn test_get_never_carries_body() {
        let template = parse_template(
            r#"{"url":"https://x","method":"get","body":{"a":"1"},"bodyType":"json"}"#,
        )
        .unwrap();
        let request = PreparedRequest::from_template(&template, &context());
        assert_eq!(request.body, None);
        assert!(!request.headers.contains("content-type"));
    }

    #[test]
    fn test_form_body_and_injected_headers() {
        let template = parse_template(
            r#"{"url":"https://x","body":{"plate":"{{plate}}","vip":"{{vip}}","none":null}}"#,
        )
        .unwrap();
        let request = PreparedRequest::from_template(&template, &context());

        assert_eq!(request.method, "POST");
        assert_eq!(
            request.body.as_deref(),
            Some("plate=%E7%B2%A4B12345&vip=1&none=")
        );
        assert_eq!(
            request.headers.get("content-type"),
            Some("application/x-www-form-urlencoded; charset=UTF-8")
        );
        assert_eq!(request.headers.get("cookie"), Some("JSESSIONID=SESS1"));
        assert_eq!(request.headers.get("referer"), Some("https://park/ref"));
    }

    #[test]
    fn test_json_body() {
        let template = parse_template(
            r#"{"url":"https://x","bodyType":"json","body":{"plate":"{{plate}}","n":2}}"#,
        )
        .unwrap();
        let request = PreparedRequest::from_template(&template, &context());
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"plate": "粤B12345", "n": 2}));
        assert_eq!(request.headers.get("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_raw_body_has_no_default_content_type() {
        let template =
            parse_template(r#"{"url":"https://x","body":"plate is {{plate}}"}"#).unwrap();
        let request = PreparedRequest::from_template(&template, &context());
        assert_eq!(request.body.as_deref(), Some("plate is 粤B12345"));
        assert!(!request.headers.contains("content-type"));
    }

    #[test]
    fn test_template_headers_win_over_injection() {
        let template = parse_template(
            r#"{"url":"https://x","headers":{"cookie":"sid={{jsessionid}}","REFERER":"https://own","content-type":"text/xml"},"body":"a=1"}"#,
        )
        .unwrap();
        let request = PreparedRequest::from_template(&template, &context());
        assert_eq!(request.headers.len(), 3);
        assert_eq!(request.headers.get("Cookie"), Some("sid=SESS1"));
        assert_eq!(request.headers.get("Referer"), Some("https://own"));
        assert_eq!(request.headers.get("Content-Type"), Some("text/xml"));
    }

    #[test]
    fn test_no_injection_without_context_values() {
        let template = parse_template(r#"{"url":"https://x","method":"GET"}"#).unwrap();
        let mut context = TemplateContext::new();
        context.insert("jsessionid", "");
        let request = PreparedRequest::from_template(&template, &context);
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_legacy_request() {
        let config = LegacyConfig {
            endpoint: Some("https://park/apply".to_string()),
            ..Default::default()
        };
        let request = LegacyRequest {
            jsessionid: "ABC".to_string(),
            referer_url: Some("https://park/ref".to_string()),
            post_params: json!({"parkid": "7"}).as_object().unwrap().clone(),
        };
        let prepared = PreparedRequest::legacy(&config, &request, "A1").unwrap();
        assert_eq!(prepared.url, "https://park/apply");
        assert_eq!(prepared.headers.get("cookie"), Some("JSESSIONID=ABC"));
        assert_eq!(
            prepared.body.as_deref(),
            Some("id=&businessid=&parkid=7&type=1&serialNumber=&orderno=&totalcount=1&carNumber=A1")
        );
    }

    #[test]
    fn test_legacy_requires_endpoint() {
        let request = LegacyRequest {
            jsessionid: "ABC".to_string(),
            referer_url: None,
            post_params: Map::new(),
        };
        assert_eq!(
            PreparedRequest::legacy(&LegacyConfig::default(), &request, "A1"),
            Err(ConfigurationError::MissingLegacyEndpoint)
        );
    }
}
