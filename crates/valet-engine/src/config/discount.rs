//! Discount-type records and operating-mode selection.

use crate::error::ConfigurationError;
use crate::response::ResponseRule;
use crate::template::{parse_template, RequestTemplate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A discount type as stored by the external configuration collaborator.
///
/// Read-only to the engine; re-read for every submission.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountTypeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub jsessionid: Option<String>,
    #[serde(default)]
    pub referer_url: Option<String>,
    #[serde(default)]
    pub scan_url: Option<String>,
    /// JSON-encoded object of legacy form parameters
    #[serde(default)]
    pub post_params: Option<String>,
    #[serde(default)]
    pub use_custom_request: bool,
    #[serde(default)]
    pub request_template: Option<String>,
    /// JSON-encoded [`ResponseRule`]
    #[serde(default)]
    pub response_template: Option<String>,
}

impl DiscountTypeConfig {
    /// Stored `postParams`, decoded. Missing or blank means no overrides.
    pub fn post_params(&self) -> Result<Map<String, Value>, ConfigurationError> {
        match non_empty(self.post_params.as_deref()) {
            None => Ok(Map::new()),
            Some(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(other) => Err(ConfigurationError::InvalidPostParams(format!(
                    "expected an object, found {other}"
                ))),
                Err(e) => Err(ConfigurationError::InvalidPostParams(e.to_string())),
            },
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Everything the legacy flow needs from a discount type.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyRequest {
    pub jsessionid: String,
    pub referer_url: Option<String>,
    pub post_params: Map<String, Value>,
}

/// A parsed custom template and its optional response rule.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomRequest {
    pub template: RequestTemplate,
    pub rule: Option<ResponseRule>,
}

/// Operating mode of a discount type, chosen once per submission.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscountMode {
    Legacy(LegacyRequest),
    Custom(CustomRequest),
}

impl DiscountMode {
    /// Select and validate the mode for a discount type.
    ///
    /// `useCustomRequest` picks custom mode, which then requires a template
    /// that parses; otherwise legacy mode requires a session id. Neither mode
    /// ever falls back to the other.
    pub fn from_config(config: &DiscountTypeConfig) -> Result<Self, ConfigurationError> {
        if config.use_custom_request {
            let raw = non_empty(config.request_template.as_deref())
                .ok_or(ConfigurationError::TemplateEmpty)?;
            let template = parse_template(raw).ok_or(ConfigurationError::TemplateParseFailed)?;
            let rule = match non_empty(config.response_template.as_deref()) {
                None => None,
                Some(raw) => Some(
                    ResponseRule::from_json(raw)
                        .map_err(|e| ConfigurationError::InvalidResponseRule(e.to_string()))?,
                ),
            };
            return Ok(DiscountMode::Custom(CustomRequest { template, rule }));
        }

        let jsessionid = non_empty(config.jsessionid.as_deref())
            .ok_or(ConfigurationError::MissingSessionId)?
            .to_string();
        Ok(DiscountMode::Legacy(LegacyRequest {
            jsessionid,
            referer_url: non_empty(config.referer_url.as_deref()).map(str::to_string),
            post_params: config.post_params()?,
        }))
    }
}
