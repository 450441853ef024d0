//! Per-request response/failure callback registries.
//!
//! Components register callbacks during the before-event and before-request
//! phases; the registries are consumed exactly once when the request
//! settles. This replaces the original design's long-lived pub/sub bus with
//! state scoped to a single in-flight operation.

use crate::response::EdgeResponse;
use edgekit_types::{Error, Result};
use futures::future::{join_all, BoxFuture};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Result of one lifecycle hook or registered callback: an optional object
/// merged into the command result.
pub type HookResult = Result<Option<Value>>;

/// Callback observing a settled response. Its returned object participates
/// in the command-result merge.
pub type ResponseCallback = Box<dyn FnOnce(EdgeResponse) -> BoxFuture<'static, HookResult> + Send>;

/// Callback observing a terminal request failure. Its own errors are logged
/// and discarded; the caller always sees the original error.
pub type FailureCallback = Box<dyn FnOnce(Error) -> BoxFuture<'static, Result<()>> + Send>;

#[derive(Default)]
struct Registries {
    on_response: Mutex<Vec<ResponseCallback>>,
    on_request_failure: Mutex<Vec<FailureCallback>>,
}

/// Clone-shared pair of callback registries for one request.
#[derive(Clone, Default)]
pub struct RequestCallbacks {
    registries: Arc<Registries>,
}

impl RequestCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback to run when the request's response settles.
    pub fn on_response(&self, callback: ResponseCallback) {
        self.registries
            .on_response
            .lock()
            .expect("callback registry poisoned")
            .push(callback);
    }

    /// Registers a callback to run when the request terminally fails.
    pub fn on_request_failure(&self, callback: FailureCallback) {
        self.registries
            .on_request_failure
            .lock()
            .expect("callback registry poisoned")
            .push(callback);
    }

    /// Drains and runs all response callbacks concurrently. Results come
    /// back in registration order; the first failing callback's error wins.
    pub async fn run_response_callbacks(
        &self,
        response: &EdgeResponse,
    ) -> Result<Vec<Option<Value>>> {
        let callbacks: Vec<ResponseCallback> = std::mem::take(
            &mut *self
                .registries
                .on_response
                .lock()
                .expect("callback registry poisoned"),
        );
        let results = join_all(
            callbacks
                .into_iter()
                .map(|callback| callback(response.clone())),
        )
        .await;
        results.into_iter().collect()
    }

    /// Drains and runs all failure callbacks concurrently. Callback errors
    /// are logged and discarded so the original request error propagates.
    pub async fn run_failure_callbacks(&self, error: &Error) {
        let callbacks: Vec<FailureCallback> = std::mem::take(
            &mut *self
                .registries
                .on_request_failure
                .lock()
                .expect("callback registry poisoned"),
        );
        let results = join_all(callbacks.into_iter().map(|callback| callback(error.clone()))).await;
        for result in results {
            if let Err(callback_error) = result {
                tracing::debug!(%callback_error, "request-failure callback failed; discarding");
            }
        }
    }
}
