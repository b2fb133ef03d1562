//! Error taxonomy for the submission engine.
//!
//! Nothing here escapes the public submission API as an `Err`: the engine
//! converts every error into a failed [`SubmissionResult`](crate::SubmissionResult)
//! tagged with a [`FailureKind`], so callers can log and respond uniformly.

use serde::{Deserialize, Serialize};

/// Definitive configuration problems. These never downgrade to another mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Request template could not be parsed; fix the template before submitting")]
    TemplateParseFailed,
    #[error("Custom request is enabled but the request template is empty")]
    TemplateEmpty,
    #[error("Discount type has no session id (jsessionid); re-scan the QR code to configure it")]
    MissingSessionId,
    #[error("Discount type has no scan URL configured")]
    MissingScanUrl,
    #[error("Legacy endpoint is not configured")]
    MissingLegacyEndpoint,
    #[error("Response template is not valid JSON: {0}")]
    InvalidResponseRule(String),
    #[error("Stored post parameters are not a JSON object: {0}")]
    InvalidPostParams(String),
}

/// Errors raised while preparing or executing an outbound call.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Upstream request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid outbound request: {0}")]
    InvalidRequest(String),
    #[error("Could not extract a session from the scan URL, check the URL")]
    SessionResolution,
}

impl EngineError {
    /// Classify the error for the structured result.
    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::Configuration(ConfigurationError::TemplateParseFailed) => {
                FailureKind::TemplateParse
            }
            EngineError::Configuration(_) => FailureKind::Configuration,
            EngineError::Network(_) => FailureKind::Network,
            EngineError::InvalidRequest(_) => FailureKind::Configuration,
            EngineError::SessionResolution => FailureKind::SessionResolution,
        }
    }
}

/// Failure classification carried on a failed submission result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Configuration,
    TemplateParse,
    UpstreamParse,
    Network,
    SessionResolution,
}
