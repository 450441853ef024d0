//! The component seam.
//!
//! A component contributes lifecycle hooks, commands, or both. Hooks of one
//! phase run concurrently across components; phases themselves are strictly
//! ordered by the coordinator. Every hook has a no-op default so components
//! implement only the phases they care about.

use crate::consent::ConsentGate;
use crate::event_manager::EventManager;
use crate::lifecycle::Lifecycle;
use async_trait::async_trait;
use edgekit_net::{EdgeNetwork, EdgeResponse, HookResult, Payload, RequestCallbacks, RequestContext};
use edgekit_types::{Config, CookieJar, Error, Event, Result};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Context handed to event-scoped hooks (`on_before_event`,
/// `on_before_data_collection_request`).
///
/// The event and payload are shared with the caller and with other
/// components; mutation goes through their interior-mutability APIs.
pub struct EventContext {
    pub event: Arc<Mutex<Event>>,
    pub payload: Arc<Payload>,
    pub render_decisions: bool,
    pub decision_scopes: Vec<String>,
    pub callbacks: RequestCallbacks,
}

/// Shared collaborators handed to each component once registration is
/// complete. Components that keep a collaborator past this call should hold
/// a `Weak` where the collaborator (transitively) owns the component, so the
/// instance graph stays acyclic.
pub struct ComponentTools {
    pub config: Arc<Config>,
    pub cookie_jar: Arc<dyn CookieJar>,
    pub consent: Arc<ConsentGate>,
    pub event_manager: Arc<EventManager>,
    pub edge: Arc<EdgeNetwork>,
    pub lifecycle: Arc<Lifecycle>,
}

/// One pluggable unit of the pipeline.
#[async_trait]
pub trait Component: Send + Sync {
    /// Stable unique name, also used in error attribution.
    fn namespace(&self) -> &'static str;

    /// Called once after every component is registered, before any command
    /// runs.
    fn on_components_registered(&self, _tools: &ComponentTools) {}

    /// Commands this component serves, in the order they should be listed.
    fn command_names(&self) -> &'static [&'static str] {
        &[]
    }

    /// Runs one of the commands advertised by [`Component::command_names`].
    async fn run_command(&self, name: &str, _options: Value) -> Result<Value> {
        Err(Error::component(
            self.namespace(),
            format!("The {name} command is not implemented."),
        ))
    }

    /// Event created; components may mutate it and the payload, and register
    /// response/failure callbacks. An error vetoes the whole operation.
    async fn on_before_event(&self, _ctx: &EventContext) -> HookResult {
        Ok(None)
    }

    /// Consent granted; the request is about to be handed to the network
    /// layer. Runs only for data-collection requests.
    async fn on_before_data_collection_request(&self, _ctx: &EventContext) -> HookResult {
        Ok(None)
    }

    /// Request finalized but not yet sent; last chance to mutate the payload
    /// or flip the third-party-domain flag. Runs for every request.
    async fn on_before_request(&self, _ctx: &RequestContext) -> HookResult {
        Ok(None)
    }

    /// A well-formed response arrived. The returned object participates in
    /// the command-result merge.
    async fn on_response(&self, _response: &EdgeResponse) -> HookResult {
        Ok(None)
    }

    /// The request failed terminally (transport, shape or body errors).
    async fn on_request_failure(&self, _error: &Error) -> HookResult {
        Ok(None)
    }
}
