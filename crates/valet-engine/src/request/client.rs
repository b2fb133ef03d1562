//! HTTP client creation and the outbound transport seam.

use super::builder::PreparedRequest;
use crate::config::HttpConfig;
use crate::error::EngineError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect, Client, Method};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Raw upstream answer: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a prepared request exactly once. No retries at this layer.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> Result<UpstreamResponse, EngineError>;
}

/// Create the client used for discount calls. Redirects are followed.
pub fn create_http_client(config: &HttpConfig) -> Result<Client, EngineError> {
    let client = base_builder(config).build()?;
    info!(
        "HTTP client configured: timeout={}s, connect_timeout={}s",
        config.request_timeout_secs, config.connect_timeout_secs
    );
    Ok(client)
}

/// Create the client used for session discovery. Redirects are never
/// followed so the `Location` header can be inspected.
pub fn create_discovery_client(config: &HttpConfig) -> Result<Client, EngineError> {
    Ok(base_builder(config)
        .redirect(redirect::Policy::none())
        .build()?)
}

fn base_builder(config: &HttpConfig) -> reqwest::ClientBuilder {
    if config.tls_skip_verify {
        warn!("TLS certificate verification DISABLED for outbound calls (development/testing only)");
    }
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .user_agent(config.user_agent.clone())
        .danger_accept_invalid_certs(config.tls_skip_verify)
}

/// [`Transport`] backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self, EngineError> {
        Ok(Self::new(create_http_client(config)?))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<UpstreamResponse, EngineError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| EngineError::InvalidRequest(format!("method '{}'", request.method)))?;
        let headers = to_header_map(request);

        let mut builder = self
            .client
            .request(method, request.url.as_str())
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        debug!("Sending {} {}", request.method, request.url);
        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                EngineError::InvalidRequest(format!("url '{}': {}", request.url, e))
            } else {
                EngineError::Network(e)
            }
        })?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        info!("{} {} -> {}", request.method, request.url, status);

        Ok(UpstreamResponse { status, body })
    }
}

/// Convert headers, skipping any the HTTP stack cannot represent.
fn to_header_map(request: &PreparedRequest) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in request.headers.iter() {
        match (
            HeaderName::from_bytes(name.trim().as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => warn!("Skipping header '{}' that is not valid on the wire", name),
        }
    }
    map
}
