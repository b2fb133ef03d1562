//! Response evaluation against a [`ResponseRule`].

use super::lenient::parse_lenient;
use super::rule::{ResponseRule, RuleType, SuccessRule};
use crate::value::{is_truthy, js_string, loose_equals, value_at_path};
use regex::Regex;
use serde_json::Value;
use tracing::warn;

/// Diagnostic used when a JSON rule meets a body that is not JSON.
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON response";

/// Outcome of evaluating one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub success: bool,
    pub message: Option<String>,
    pub redirect_url: Option<String>,
    /// Parsed body, for JSON rules.
    pub json: Option<Value>,
    /// JSON interpretation was required but the body could not be parsed.
    pub invalid_json: bool,
}

/// Evaluate `raw` against an optional rule. `None` means no rule is
/// configured and the caller should use the built-in heuristic.
pub fn evaluate(raw: &str, rule: Option<&ResponseRule>) -> Option<Evaluation> {
    rule.map(|rule| rule.evaluate(raw))
}

impl ResponseRule {
    pub fn evaluate(&self, raw: &str) -> Evaluation {
        match self.effective_type() {
            RuleType::Json => self.evaluate_json(raw),
            RuleType::Text => self.evaluate_text(raw),
        }
    }

    fn evaluate_json(&self, raw: &str) -> Evaluation {
        let Some(json) = parse_lenient(raw) else {
            return Evaluation {
                success: false,
                message: Some(INVALID_JSON_MESSAGE.to_string()),
                invalid_json: true,
                ..Default::default()
            };
        };

        let success = self
            .success
            .as_ref()
            .map(|rule| json_success(rule, &json))
            .unwrap_or(false);

        let message = self
            .message_path
            .as_deref()
            .and_then(|path| value_at_path(&json, path))
            .filter(|v| !v.is_null())
            .map(js_string);

        let redirect_url = self
            .redirect_path
            .as_deref()
            .and_then(|path| value_at_path(&json, path))
            .and_then(Value::as_str)
            .map(str::to_string);

        Evaluation {
            success,
            message,
            redirect_url,
            json: Some(json),
            invalid_json: false,
        }
    }

    fn evaluate_text(&self, raw: &str) -> Evaluation {
        let rule = self.success.as_ref();

        if let Some(pattern) = rule.and_then(|r| r.regex.as_deref()) {
            return Evaluation {
                success: regex_matches(pattern, raw),
                ..Default::default()
            };
        }
        if let Some(expected) = rule.and_then(|r| r.equals.as_ref()) {
            return Evaluation {
                success: raw.contains(&js_string(expected)),
                ..Default::default()
            };
        }
        Evaluation {
            success: false,
            message: Some(raw.to_string()),
            ..Default::default()
        }
    }
}

fn json_success(rule: &SuccessRule, json: &Value) -> bool {
    let target = rule.path.as_deref().and_then(|path| value_at_path(json, path));

    if let Some(expected) = &rule.equals {
        return loose_equals(target, expected);
    }
    if let Some(pattern) = &rule.regex {
        let haystack = match (&rule.path, target) {
            (Some(_), Some(value)) => js_string(value),
            (Some(_), None) => "undefined".to_string(),
            (None, _) => json.to_string(),
        };
        return regex_matches(pattern, &haystack);
    }
    if rule.path.is_some() {
        return target.map(is_truthy).unwrap_or(false);
    }
    false
}

fn regex_matches(pattern: &str, haystack: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(haystack),
        Err(e) => {
            warn!("Invalid success regex '{}': {}", pattern, e);
            false
        }
    }
}
