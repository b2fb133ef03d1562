//! Outbound request construction and execution.
//!
//! - `builder` - resolves a template and context into a [`PreparedRequest`]
//! - `client` - reqwest client setup and the [`Transport`] seam

mod builder;
mod client;

pub use builder::{encode_form, PreparedRequest};
pub use client::{
    create_discovery_client, create_http_client, HttpTransport, Transport, UpstreamResponse,
};

use crate::context::TemplateContext;
use crate::error::EngineError;
use crate::template::RequestTemplate;

/// Resolves templates and sends them over a [`Transport`].
pub struct RequestBuilder<T: Transport> {
    transport: T,
}

impl<T: Transport> RequestBuilder<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Resolve without sending.
    pub fn prepare(&self, template: &RequestTemplate, context: &TemplateContext) -> PreparedRequest {
        PreparedRequest::from_template(template, context)
    }

    /// Resolve and send once.
    pub async fn execute(
        &self,
        template: &RequestTemplate,
        context: &TemplateContext,
    ) -> Result<UpstreamResponse, EngineError> {
        let request = self.prepare(template, context);
        self.transport.send(&request).await
    }

    /// Send an already prepared request once.
    pub async fn send(&self, request: &PreparedRequest) -> Result<UpstreamResponse, EngineError> {
        self.transport.send(request).await
    }
}
