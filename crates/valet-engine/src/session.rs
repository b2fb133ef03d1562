//! Session discovery from a scan URL.
//!
//! A scan URL (usually printed as a QR code) answers with a redirect whose
//! target carries the provider's `jsessionid`, either as a `;jsessionid=`
//! path parameter or as a query parameter. The redirect's query string also
//! holds the default legacy parameters for the discount type.

use crate::config::{DiscountTypeConfig, HttpConfig};
use crate::error::{ConfigurationError, EngineError};
use crate::request::create_discovery_client;
use regex::Regex;
use reqwest::header::LOCATION;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

static SESSION_ID_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_session_id_regex() -> &'static Regex {
    SESSION_ID_REGEX.get_or_init(|| Regex::new(r"(?i)jsessionid=([A-Z0-9]+)").unwrap())
}

/// Find a `jsessionid=` value anywhere in the text.
pub fn extract_session_id(text: &str) -> Option<String> {
    get_session_id_regex()
        .captures(text)
        .map(|caps| caps[1].to_string())
}

/// Session discovered from a scan URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub jsessionid: String,
    /// Absolute redirect target, when the session came from a redirect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Query parameters of the redirect target.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
}

/// Updated discount-type fields produced by re-configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub jsessionid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer_url: Option<String>,
    pub post_params: Map<String, Value>,
}

impl SessionUpdate {
    /// Apply the update to a discount-type record.
    pub fn apply_to(&self, config: &mut DiscountTypeConfig) {
        config.jsessionid = Some(self.jsessionid.clone());
        if let Some(referer) = &self.referer_url {
            config.referer_url = Some(referer.clone());
        }
        config.post_params = Some(Value::Object(self.post_params.clone()).to_string());
    }
}

pub struct SessionResolver {
    client: Client,
}

impl SessionResolver {
    /// `client` must not follow redirects.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self, EngineError> {
        Ok(Self::new(create_discovery_client(config)?))
    }

    /// Discover the session behind a scan URL.
    ///
    /// Follows at most one redirect hop by hand. Returns `None` when no session
    /// id can be found or the call fails; failures are logged, not raised.
    pub async fn resolve(&self, scan_url: &str) -> Option<SessionInfo> {
        let response = match self.client.get(scan_url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Session discovery request to {} failed: {}", scan_url, e);
                return None;
            }
        };

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if let Some(location) = location {
            return resolve_redirect(scan_url, &location);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read session discovery body from {}: {}", scan_url, e);
                return None;
            }
        };
        let jsessionid = extract_session_id(&body);
        if jsessionid.is_none() {
            debug!("No redirect and no jsessionid in body from {}", scan_url);
        }
        jsessionid.map(|jsessionid| SessionInfo {
            jsessionid,
            redirect_url: None,
            query: BTreeMap::new(),
        })
    }

    /// Re-configure a discount type from its scan URL.
    ///
    /// The stored `postParams` are overlaid with the redirect's query
    /// parameters (except the session id itself); the redirect target becomes
    /// the new referer.
    pub async fn reconfigure(
        &self,
        config: &DiscountTypeConfig,
    ) -> Result<SessionUpdate, EngineError> {
        let scan_url = config
            .scan_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigurationError::MissingScanUrl)?;

        let session = self
            .resolve(scan_url)
            .await
            .ok_or(EngineError::SessionResolution)?;

        let mut post_params = config.post_params()?;
        for (key, value) in &session.query {
            if !key.eq_ignore_ascii_case("jsessionid") {
                post_params.insert(key.clone(), Value::String(value.clone()));
            }
        }

        info!(
            "Resolved session for discount type {}",
            config.code.as_deref().unwrap_or("<unnamed>")
        );
        Ok(SessionUpdate {
            jsessionid: session.jsessionid,
            referer_url: session.redirect_url.or_else(|| config.referer_url.clone()),
            post_params,
        })
    }
}

fn resolve_redirect(scan_url: &str, location: &str) -> Option<SessionInfo> {
    let absolute = match Url::parse(scan_url).and_then(|base| base.join(location)) {
        Ok(url) => url,
        Err(e) => {
            warn!("Cannot resolve redirect '{}' against {}: {}", location, scan_url, e);
            return None;
        }
    };

    let Some(jsessionid) = extract_session_id(absolute.as_str()) else {
        debug!("Redirect target {} carries no jsessionid", absolute);
        return None;
    };

    let query = absolute
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    Some(SessionInfo {
        jsessionid,
        redirect_url: Some(absolute.to_string()),
        query,
    })
}
