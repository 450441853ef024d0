//! Transport strategy seam.
//!
//! The pipeline is transport-agnostic: anything that can POST a text body
//! and surface `(status, body)` can carry requests. Production uses
//! [`ReqwestStrategy`]; tests inject hand mocks.

use async_trait::async_trait;
use edgekit_types::{Error, Result};
use reqwest::Client;
use std::time::Duration;

/// Raw transport outcome, before shape validation.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Abstract transport interface.
#[async_trait]
pub trait NetworkStrategy: Send + Sync {
    /// Sends the serialized payload, resolving with the raw response or
    /// failing with a transport-level error.
    async fn send(&self, url: &str, body: &str) -> Result<TransportResponse>;
}

/// HTTPS transport backed by `reqwest`.
pub struct ReqwestStrategy {
    client: Client,
}

impl ReqwestStrategy {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create HTTP client");
        Self { client }
    }
}

impl Default for ReqwestStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkStrategy for ReqwestStrategy {
    async fn send(&self, url: &str, body: &str) -> Result<TransportResponse> {
        let response = self
            .client
            .post(url)
            // text/plain keeps the request a CORS simple request, matching
            // the collection server's contract.
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=UTF-8")
            .body(body.to_string())
            .send()
            .await
            .map_err(Error::network)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(Error::network)?;
        Ok(TransportResponse { status, body })
    }
}
