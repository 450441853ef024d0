//! The lifecycle coordinator.
//!
//! Fans each phase out to every component concurrently and collects the
//! per-component results in registration order. Phases are strictly
//! sequential: a phase resolves only when every component's hook has, and
//! the first hook error (in registration order) fails the phase.

use crate::component::{Component, EventContext};
use async_trait::async_trait;
use edgekit_net::{EdgeResponse, RequestContext, RequestLifecycle};
use edgekit_types::{Error, Result};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;

pub struct Lifecycle {
    components: Vec<Arc<dyn Component>>,
}

impl Lifecycle {
    pub fn new(components: Vec<Arc<dyn Component>>) -> Self {
        Self { components }
    }

    /// Broadcasts the event-created phase.
    pub async fn on_before_event(&self, ctx: &EventContext) -> Result<Vec<Option<Value>>> {
        join_all(
            self.components
                .iter()
                .map(|component| component.on_before_event(ctx)),
        )
        .await
        .into_iter()
        .collect()
    }

    /// Broadcasts the post-consent, pre-network phase of data-collection
    /// requests.
    pub async fn on_before_data_collection_request(
        &self,
        ctx: &EventContext,
    ) -> Result<Vec<Option<Value>>> {
        join_all(
            self.components
                .iter()
                .map(|component| component.on_before_data_collection_request(ctx)),
        )
        .await
        .into_iter()
        .collect()
    }
}

#[async_trait]
impl RequestLifecycle for Lifecycle {
    async fn on_before_request(&self, ctx: &RequestContext) -> Result<Vec<Option<Value>>> {
        join_all(
            self.components
                .iter()
                .map(|component| component.on_before_request(ctx)),
        )
        .await
        .into_iter()
        .collect()
    }

    async fn on_response(&self, response: &EdgeResponse) -> Result<Vec<Option<Value>>> {
        join_all(
            self.components
                .iter()
                .map(|component| component.on_response(response)),
        )
        .await
        .into_iter()
        .collect()
    }

    async fn on_request_failure(&self, error: &Error) -> Result<Vec<Option<Value>>> {
        join_all(
            self.components
                .iter()
                .map(|component| component.on_request_failure(error)),
        )
        .await
        .into_iter()
        .collect()
    }
}
