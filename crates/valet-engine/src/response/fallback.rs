//! Built-in interpretation of the parking provider's native response shape.
//!
//! The provider answers discount calls with `{"info": {...}}`. When
//! `info.discountcharge` is present the call went through and the discount
//! details are extracted; otherwise the HTTP status decides.

use super::lenient::parse_lenient;
use crate::value::{js_string, value_at_path};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discount details reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountInfo {
    pub plate: String,
    pub discountcharge: f64,
    pub needcharge: String,
    pub entertime: String,
    pub staytime: String,
}

impl DiscountInfo {
    /// Extract from `json.info`, if `info.discountcharge` is present.
    ///
    /// `fallback_plate` is used when the provider omits the plate.
    pub fn from_json(json: &Value, fallback_plate: &str) -> Option<Self> {
        let info = json.get("info")?;
        let charge = info.get("discountcharge").filter(|v| !v.is_null())?;

        let text = |key: &str| {
            info.get(key)
                .filter(|v| !v.is_null())
                .map(js_string)
        };

        Some(Self {
            plate: text("plate").unwrap_or_else(|| fallback_plate.to_string()),
            discountcharge: to_number(charge),
            needcharge: text("needcharge").unwrap_or_else(|| "0".to_string()),
            entertime: text("entertime").unwrap_or_default(),
            staytime: text("staytime").unwrap_or_default(),
        })
    }
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

/// Result of the built-in heuristic.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicOutcome {
    pub success: bool,
    pub message: Option<String>,
    pub discount_info: Option<DiscountInfo>,
}

/// Interpret a response without an operator rule.
pub fn interpret(status: u16, raw: &str, plate: &str) -> HeuristicOutcome {
    let json = parse_lenient(raw);

    if let Some(info) = json
        .as_ref()
        .and_then(|json| DiscountInfo::from_json(json, plate))
    {
        return HeuristicOutcome {
            success: true,
            message: None,
            discount_info: Some(info),
        };
    }

    if (200..300).contains(&status) {
        return HeuristicOutcome {
            success: true,
            message: None,
            discount_info: None,
        };
    }

    let message = json
        .as_ref()
        .and_then(|json| value_at_path(json, "info.errmsg"))
        .filter(|v| !v.is_null())
        .map(js_string)
        .filter(|msg| msg != "ok");

    HeuristicOutcome {
        success: false,
        message,
        discount_info: None,
    }
}
