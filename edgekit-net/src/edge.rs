//! Edge request orchestration.
//!
//! `EdgeNetwork::send_request` runs one request through the full
//! before-request → send → settle sequence, fanning the outcome back out to
//! lifecycle hooks and per-request callbacks, and merging their results
//! into the value the command's caller receives.
//!
//! Invariants enforced here:
//! - the endpoint domain is resolved only after `on_before_request`
//!   completes, so components can still flip the third-party flag
//! - response cookies are stored before any response hook fires
//! - on the failure path the caller always observes the *original*
//!   transport/validation error, never an error thrown by a failure hook

use crate::callbacks::RequestCallbacks;
use crate::cookie_transfer::{cookies_to_payload, response_to_cookies};
use crate::payload::Payload;
use crate::response::EdgeResponse;
use crate::send::NetworkRequester;
use async_trait::async_trait;
use edgekit_types::{shallow_merge, Config, CookieJar, Error, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Shared domain used when a request must carry third-party identity
/// cookies (first identity bootstrap only).
pub const ID_THIRD_PARTY_DOMAIN: &str = "adobedc.demdex.net";

/// Context handed to request-scoped lifecycle hooks.
pub struct RequestContext {
    pub payload: Arc<Payload>,
    pub callbacks: RequestCallbacks,
}

/// The seam through which the network layer broadcasts request-scoped
/// phases to the component pipeline. Implemented by the coordinator in
/// `edgekit-core`; per-component results come back in registration order.
#[async_trait]
pub trait RequestLifecycle: Send + Sync {
    async fn on_before_request(&self, ctx: &RequestContext) -> Result<Vec<Option<Value>>>;
    async fn on_response(&self, response: &EdgeResponse) -> Result<Vec<Option<Value>>>;
    async fn on_request_failure(&self, error: &Error) -> Result<Vec<Option<Value>>>;
}

/// The network layer: builds, sends and settles edge requests.
pub struct EdgeNetwork {
    config: Arc<Config>,
    cookie_jar: Arc<dyn CookieJar>,
    requester: NetworkRequester,
}

impl EdgeNetwork {
    pub fn new(
        config: Arc<Config>,
        cookie_jar: Arc<dyn CookieJar>,
        requester: NetworkRequester,
    ) -> Self {
        Self {
            config,
            cookie_jar,
            requester,
        }
    }

    /// Sends one request and resolves with the shallow merge of all
    /// response-hook results (registered callbacks first, then lifecycle
    /// results, later entries overriding earlier ones).
    pub async fn send_request(
        &self,
        lifecycle: &dyn RequestLifecycle,
        payload: Arc<Payload>,
        action: &str,
        callbacks: RequestCallbacks,
    ) -> Result<Value> {
        let ctx = RequestContext {
            payload: Arc::clone(&payload),
            callbacks: callbacks.clone(),
        };
        lifecycle.on_before_request(&ctx).await?;

        let domain = if payload.use_id_third_party_domain() {
            ID_THIRD_PARTY_DOMAIN
        } else {
            &self.config.edge_domain
        };
        cookies_to_payload(&*self.cookie_jar, &self.config.org_id, &payload);

        let request_id = Uuid::new_v4().to_string();
        let url = format!(
            "https://{domain}/{base}/v1/{action}?configId={config_id}&requestId={request_id}",
            base = self.config.edge_base_path,
            config_id = self.config.edge_config_id,
        );
        let body = payload.serialize()?;

        let network_result = match self.requester.send(&url, &body, &request_id).await {
            Ok(result) => result,
            Err(error) => return self.settle_failure(lifecycle, &callbacks, error).await,
        };
        let response = match EdgeResponse::from_network(&network_result) {
            Ok(response) => response,
            Err(error) => return self.settle_failure(lifecycle, &callbacks, error).await,
        };

        // Cookies land before any response hook observes the response.
        response_to_cookies(&*self.cookie_jar, &response);
        response.process_warnings_and_errors()?;

        // Lifecycle hooks run first so component side effects (identity
        // persistence, consent refresh) precede registered callbacks; the
        // merge keeps callback results ahead of lifecycle results.
        let lifecycle_results = lifecycle.on_response(&response).await?;
        let callback_results = callbacks.run_response_callbacks(&response).await?;

        let mut merged = Map::new();
        for result in callback_results.into_iter().chain(lifecycle_results) {
            if let Some(Value::Object(object)) = result {
                shallow_merge(&mut merged, &object);
            }
        }
        Ok(Value::Object(merged))
    }

    /// Runs failure hooks and callbacks, then propagates the original error.
    async fn settle_failure(
        &self,
        lifecycle: &dyn RequestLifecycle,
        callbacks: &RequestCallbacks,
        error: Error,
    ) -> Result<Value> {
        if let Err(hook_error) = lifecycle.on_request_failure(&error).await {
            debug!(%hook_error, "request-failure hook failed; discarding");
        }
        callbacks.run_failure_callbacks(&error).await;
        Err(error)
    }
}
