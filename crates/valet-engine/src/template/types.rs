//! Request template data model.

use serde::Serialize;
use serde_json::{Map, Value};

/// How a template body is serialized on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    /// Sent exactly as written, no default content type.
    Raw,
    /// `application/x-www-form-urlencoded`
    Form,
    /// `application/json`
    Json,
}

impl BodyType {
    /// Parse an explicit body type, case-insensitively. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "raw" => Some(BodyType::Raw),
            "form" => Some(BodyType::Form),
            "json" => Some(BodyType::Json),
            _ => None,
        }
    }

    /// Infer a body type from the body shape.
    ///
    /// Object bodies are form fields; string bodies are form-encoded only when
    /// they contain `=`.
    pub fn infer(body: Option<&TemplateBody>) -> Self {
        match body {
            Some(TemplateBody::Fields(_)) => BodyType::Form,
            Some(TemplateBody::Text(text)) if text.contains('=') => BodyType::Form,
            _ => BodyType::Raw,
        }
    }

    /// Default `Content-Type` when the template does not set one.
    pub fn default_content_type(&self) -> Option<&'static str> {
        match self {
            BodyType::Raw => None,
            BodyType::Form => Some("application/x-www-form-urlencoded; charset=UTF-8"),
            BodyType::Json => Some("application/json"),
        }
    }
}

/// A template body: verbatim text or a key/value mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TemplateBody {
    Text(String),
    Fields(Map<String, Value>),
}

/// Ordered header list with case-insensitive names.
///
/// Setting an existing header replaces its value in place, keeping the
/// original position and spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(String, String)>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace (case-insensitively) a header.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Merge another list on top of this one.
    pub fn merge<I, K, V>(&mut self, other: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in other {
            self.set(k, v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderList {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = HeaderList::new();
        headers.merge(iter);
        headers
    }
}

impl Serialize for HeaderList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// An operator-authored HTTP request, before variable substitution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTemplate {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "HeaderList::is_empty")]
    pub headers: HeaderList,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<TemplateBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_type: Option<BodyType>,
}

impl RequestTemplate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: None,
            headers: HeaderList::new(),
            body: None,
            body_type: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_body(mut self, body: TemplateBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_body_type(mut self, body_type: BodyType) -> Self {
        self.body_type = Some(body_type);
        self
    }

    /// Upper-cased method, `POST` when unset.
    pub fn method(&self) -> String {
        self.method
            .as_deref()
            .map(|m| m.trim().to_ascii_uppercase())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "POST".to_string())
    }

    /// Explicit body type, or the one inferred from the body.
    pub fn body_type(&self) -> BodyType {
        self.body_type
            .unwrap_or_else(|| BodyType::infer(self.body.as_ref()))
    }

    /// Build a template from a loosely typed JSON document.
    ///
    /// Returns `None` when `url` is missing or empty. Header values and
    /// non-object bodies are stringified; unknown body types are inferred.
    pub fn from_document(doc: &Value) -> Option<Self> {
        let obj = doc.as_object()?;
        let url = obj
            .get("url")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|u| !u.is_empty())?;

        let method = obj
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_string);

        let headers = obj
            .get("headers")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k.clone(), crate::value::js_string(v)))
                    .collect()
            })
            .unwrap_or_default();

        let body = match obj.get("body") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(TemplateBody::Text(s.clone())),
            Some(Value::Object(map)) => Some(TemplateBody::Fields(map.clone())),
            Some(other) => Some(TemplateBody::Text(other.to_string())),
        };

        let body_type = obj
            .get("bodyType")
            .and_then(Value::as_str)
            .and_then(BodyType::parse)
            .unwrap_or_else(|| BodyType::infer(body.as_ref()));

        Some(Self {
            url: url.to_string(),
            method,
            headers,
            body,
            body_type: Some(body_type),
        })
    }
}
