//! Legacy discount endpoint settings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Fixed request shape used by discount types without a custom template.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LegacyConfig {
    /// Discount application endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Form field carrying the submitted plate
    #[serde(default = "default_plate_param")]
    pub plate_param: String,
    /// Base form parameters, overlaid by the discount type's stored `postParams`.
    /// Configured entries are laid over the built-in keys, never replacing them.
    #[serde(default = "default_params", deserialize_with = "merge_default_params")]
    pub default_params: Map<String, Value>,
}

fn default_plate_param() -> String {
    "carNumber".to_string()
}

fn default_params() -> Map<String, Value> {
    [
        ("id", ""),
        ("businessid", ""),
        ("parkid", ""),
        ("type", "1"),
        ("serialNumber", ""),
        ("orderno", ""),
        ("totalcount", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
    .collect()
}

fn merge_default_params<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let configured = Option::<Map<String, Value>>::deserialize(deserializer)?;
    let mut params = default_params();
    for (key, value) in configured.unwrap_or_default() {
        params.insert(key, value);
    }
    Ok(params)
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            plate_param: default_plate_param(),
            default_params: default_params(),
        }
    }
}

impl LegacyConfig {
    /// Form parameters for one submission: defaults, then stored overrides,
    /// then the plate.
    pub fn params_for(&self, stored: &Map<String, Value>, plate: &str) -> Vec<(String, String)> {
        let mut params = self.default_params.clone();
        for (key, value) in stored {
            params.insert(key.clone(), value.clone());
        }
        params.insert(self.plate_param.clone(), Value::String(plate.to_string()));

        params
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::Null => String::new(),
                    other => crate::value::js_string(&other),
                };
                (k, value)
            })
            .collect()
    }
}
