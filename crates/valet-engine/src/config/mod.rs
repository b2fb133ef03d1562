//! Configuration types for the Valet engine.
//!
//! The engine file (YAML) carries process-wide settings: HTTP client
//! deadlines, the legacy endpoint and logging. Per-discount-type records come
//! from the external store and are modelled by [`DiscountTypeConfig`].

mod discount;
mod legacy;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use discount::{CustomRequest, DiscountMode, DiscountTypeConfig, LegacyRequest};
pub use legacy::LegacyConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub legacy: LegacyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.http.request_timeout_secs == 0 {
            anyhow::bail!(
                "http.request_timeout_secs must be greater than 0; \
                 outbound calls always need an explicit deadline"
            );
        }

        if self.http.connect_timeout_secs > self.http.request_timeout_secs {
            anyhow::bail!(
                "http.connect_timeout_secs ({}) cannot exceed http.request_timeout_secs ({})",
                self.http.connect_timeout_secs,
                self.http.request_timeout_secs
            );
        }

        if let Some(endpoint) = &self.legacy.endpoint {
            if url::Url::parse(endpoint).is_err() {
                anyhow::bail!("legacy.endpoint is not a valid absolute URL: '{}'", endpoint);
            }
        }

        if self.legacy.plate_param.trim().is_empty() {
            anyhow::bail!("legacy.plate_param cannot be empty");
        }

        Ok(())
    }
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Total deadline for one outbound call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Skip TLS certificate verification (for self-signed certs in dev/test)
    #[serde(default)]
    pub tls_skip_verify: bool,
}

fn default_request_timeout() -> u64 {
    15
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_user_agent() -> String {
    format!("valet/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
            tls_skip_verify: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
