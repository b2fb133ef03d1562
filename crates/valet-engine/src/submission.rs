//! One discount submission, end to end.
//!
//! The engine selects the operating mode of the discount type, builds the
//! context and the outbound request, sends it exactly once and interprets the
//! answer. Errors never escape: every path produces a [`SubmissionResult`].

use crate::config::{DiscountMode, DiscountTypeConfig, EngineConfig, LegacyConfig};
use crate::context::TemplateContext;
use crate::error::{EngineError, FailureKind};
use crate::request::{HttpTransport, PreparedRequest, RequestBuilder, Transport, UpstreamResponse};
use crate::response::{interpret, parse_lenient, DiscountInfo, ResponseRule, INVALID_JSON_MESSAGE};
use crate::template::parse_note;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

const DEFAULT_SUCCESS_MESSAGE: &str = "Discount applied";
const DEFAULT_FAILURE_MESSAGE: &str = "Discount request was rejected";

/// Guest-side input for one submission.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub plate_number: String,
    #[serde(default)]
    pub discount_type_code: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Caller-supplied variables, layered last into the template context
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl Submission {
    pub fn new(plate_number: impl Into<String>, discount_type_code: impl Into<String>) -> Self {
        Self {
            plate_number: plate_number.into(),
            discount_type_code: discount_type_code.into(),
            ..Default::default()
        }
    }
}

/// Structured outcome of a submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_info: Option<DiscountInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureKind>,
}

impl SubmissionResult {
    pub fn from_error(err: &EngineError) -> Self {
        Self {
            success: false,
            message: Some(err.to_string()),
            error: Some(err.kind()),
            ..Default::default()
        }
    }
}

/// A submission resolved up to the point of sending.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSubmission {
    pub request: PreparedRequest,
    /// Operator rule; `None` selects the built-in heuristic.
    pub response_rule: Option<ResponseRule>,
    pub plate: String,
}

impl PlannedSubmission {
    /// Interpret the upstream answer to this request.
    pub fn interpret(&self, response: UpstreamResponse) -> SubmissionResult {
        match &self.response_rule {
            Some(rule) => self.interpret_with_rule(rule, response),
            None => {
                let outcome = interpret(response.status, &response.body, &self.plate);
                let message = outcome.message.unwrap_or_else(|| {
                    default_message(outcome.success, response.status)
                });
                SubmissionResult {
                    success: outcome.success,
                    message: Some(message),
                    raw_response: Some(response.body),
                    discount_info: outcome.discount_info,
                    ..Default::default()
                }
            }
        }
    }

    fn interpret_with_rule(&self, rule: &ResponseRule, response: UpstreamResponse) -> SubmissionResult {
        let evaluation = rule.evaluate(&response.body);

        if evaluation.invalid_json {
            warn!(
                "Response from {} is not JSON (HTTP {})",
                self.request.url, response.status
            );
            return SubmissionResult {
                success: false,
                message: Some(INVALID_JSON_MESSAGE.to_string()),
                raw_response: Some(response.body),
                error: Some(FailureKind::UpstreamParse),
                ..Default::default()
            };
        }

        let discount_info = match &evaluation.json {
            Some(json) => DiscountInfo::from_json(json, &self.plate),
            None => parse_lenient(&response.body)
                .and_then(|json| DiscountInfo::from_json(&json, &self.plate)),
        };

        let message = evaluation
            .message
            .unwrap_or_else(|| default_message(evaluation.success, response.status));

        SubmissionResult {
            success: evaluation.success,
            message: Some(message),
            raw_response: Some(response.body),
            redirect_url: evaluation.redirect_url,
            discount_info,
            error: None,
        }
    }
}

fn default_message(success: bool, status: u16) -> String {
    if success {
        DEFAULT_SUCCESS_MESSAGE.to_string()
    } else if (200..300).contains(&status) {
        DEFAULT_FAILURE_MESSAGE.to_string()
    } else {
        format!("{DEFAULT_FAILURE_MESSAGE} (HTTP {status})")
    }
}

/// Runs submissions against the parking provider.
pub struct SubmissionEngine<T: Transport = HttpTransport> {
    requests: RequestBuilder<T>,
    legacy: LegacyConfig,
}

impl SubmissionEngine<HttpTransport> {
    /// Build an engine with a reqwest transport configured from `config`.
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let transport = HttpTransport::from_config(&config.http)?;
        Ok(Self::with_transport(transport, config.legacy.clone()))
    }
}

impl<T: Transport> SubmissionEngine<T> {
    pub fn with_transport(transport: T, legacy: LegacyConfig) -> Self {
        Self {
            requests: RequestBuilder::new(transport),
            legacy,
        }
    }

    /// Resolve a submission into a request without sending anything.
    ///
    /// Custom mode layers the note's directives on top of the template and
    /// substitutes the submission context. Legacy mode builds the fixed form
    /// call. Configuration problems surface here and never switch modes.
    pub fn prepare(
        &self,
        config: &DiscountTypeConfig,
        submission: &Submission,
    ) -> Result<PlannedSubmission, EngineError> {
        let plate = submission.plate_number.clone();

        match DiscountMode::from_config(config)? {
            DiscountMode::Custom(custom) => {
                let note = parse_note(submission.note.as_deref().unwrap_or(""));
                let mut template = custom.template;
                if !note.directives.is_empty() {
                    debug!(
                        "Applying {} header and {} body directive(s) from note",
                        note.directives.headers.len(),
                        note.directives.bodies.len()
                    );
                    note.directives.apply(&mut template);
                }

                let context = TemplateContext::for_submission(config, submission, &note);
                Ok(PlannedSubmission {
                    request: self.requests.prepare(&template, &context),
                    response_rule: custom.rule,
                    plate,
                })
            }
            DiscountMode::Legacy(legacy) => Ok(PlannedSubmission {
                request: PreparedRequest::legacy(&self.legacy, &legacy, &plate)?,
                response_rule: None,
                plate,
            }),
        }
    }

    /// Run one submission. Always returns a result, never an error.
    pub async fn submit(
        &self,
        config: &DiscountTypeConfig,
        submission: &Submission,
    ) -> SubmissionResult {
        let code = config
            .code
            .as_deref()
            .unwrap_or(submission.discount_type_code.as_str());

        let planned = match self.prepare(config, submission) {
            Ok(planned) => planned,
            Err(e) => {
                warn!("Discount type {} is misconfigured: {}", code, e);
                return SubmissionResult::from_error(&e);
            }
        };

        let response = match self.requests.send(&planned.request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "Discount call {} {} failed: {}",
                    planned.request.method, planned.request.url, e
                );
                return SubmissionResult::from_error(&e);
            }
        };

        let result = planned.interpret(response);
        info!(
            "Submission for discount type {} plate {}: success={}",
            code, planned.plate, result.success
        );
        result
    }
}
