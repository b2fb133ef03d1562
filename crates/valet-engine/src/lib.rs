//! Valet: template-driven request engine for parking-discount integrations.
//!
//! A discount type is either a fixed legacy form call or an operator-authored
//! request template. For each guest submission the engine builds a variable
//! context, resolves the template (plus any directives in the guest's note),
//! issues one upstream call and turns the answer into a [`SubmissionResult`].

// ===== Engine core =====
pub mod context;
pub mod request;
pub mod response;
pub mod session;
pub mod submission;
pub mod template;

// ===== Ambient =====
pub mod config;
pub mod error;
pub mod logging;
pub mod value;

pub use config::{DiscountMode, DiscountTypeConfig, EngineConfig};
pub use context::TemplateContext;
pub use error::{ConfigurationError, EngineError, FailureKind};
pub use request::{PreparedRequest, RequestBuilder, Transport};
pub use response::{DiscountInfo, ResponseRule};
pub use session::{SessionInfo, SessionResolver, SessionUpdate};
pub use submission::{PlannedSubmission, Submission, SubmissionEngine, SubmissionResult};
pub use template::{parse_template, RequestTemplate};
pub use value::value_at_path;
