//! Upstream response interpretation.
//!
//! - `rule` - operator-configured [`ResponseRule`]
//! - `evaluator` - evaluates a body against a rule
//! - `fallback` - built-in heuristic used when no rule is configured
//! - `lenient` - JSON parsing tolerant of JSONP and surrounding markup

mod evaluator;
mod fallback;
mod lenient;
mod rule;

pub use evaluator::{evaluate, Evaluation, INVALID_JSON_MESSAGE};
pub use fallback::{interpret, DiscountInfo, HeuristicOutcome};
pub use lenient::parse_lenient;
pub use rule::{ResponseRule, RuleType, SuccessRule};
