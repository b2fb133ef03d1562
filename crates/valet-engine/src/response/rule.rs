//! Response rule configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the upstream body is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Json,
    Text,
}

/// Success criterion. When `path` is set, `equals` takes precedence over
/// `regex`; `path` alone means "the value at `path` is truthy".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuccessRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

/// Operator-configured description of how to read an upstream response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRule {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<RuleType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<SuccessRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_path: Option<String>,
}

impl ResponseRule {
    /// Parse a rule from its stored JSON form.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Explicit type, else `json` when any path field is set, else `text`.
    pub fn effective_type(&self) -> RuleType {
        if let Some(rule_type) = self.rule_type {
            return rule_type;
        }
        let has_success_path = self
            .success
            .as_ref()
            .map(|s| s.path.is_some())
            .unwrap_or(false);
        if has_success_path || self.message_path.is_some() || self.redirect_path.is_some() {
            RuleType::Json
        } else {
            RuleType::Text
        }
    }
}
