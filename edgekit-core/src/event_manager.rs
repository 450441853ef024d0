//! The event manager.
//!
//! Drives one event through the submission sequence:
//! `on_before_event` → consent gate → `on_before_data_collection_request`
//! → network layer. The action is chosen after the hooks run, so a
//! component can still mark the event as possibly outliving the document.

use crate::component::EventContext;
use crate::consent::ConsentGate;
use crate::lifecycle::Lifecycle;
use edgekit_net::{EdgeNetwork, Payload, RequestCallbacks};
use edgekit_types::{Config, Event, Result};
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Per-send options from the `event` command.
#[derive(Default)]
pub struct SendEventOptions {
    pub render_decisions: bool,
    pub decision_scopes: Vec<String>,
}

pub struct EventManager {
    config: Arc<Config>,
    lifecycle: Arc<Lifecycle>,
    consent: Arc<ConsentGate>,
    edge: Arc<EdgeNetwork>,
}

impl EventManager {
    pub fn new(
        config: Arc<Config>,
        lifecycle: Arc<Lifecycle>,
        consent: Arc<ConsentGate>,
        edge: Arc<EdgeNetwork>,
    ) -> Self {
        Self {
            config,
            lifecycle,
            consent,
            edge,
        }
    }

    pub fn create_event(&self) -> Event {
        Event::new()
    }

    /// Sends one event, resolving with the merged response-hook results.
    pub async fn send_event(&self, mut event: Event, options: SendEventOptions) -> Result<Value> {
        if let Some(callback) = &self.config.on_before_event_send {
            let callback = Arc::clone(callback);
            event.set_last_chance_callback(Box::new(move |xdm, data| callback(xdm, data)));
        }

        let event = Arc::new(Mutex::new(event));
        let payload = Arc::new(Payload::new());
        payload.merge_meta(&gateway_meta(&self.config.org_id));
        payload.add_event(Arc::clone(&event));

        let callbacks = RequestCallbacks::new();
        let ctx = EventContext {
            event: Arc::clone(&event),
            payload: Arc::clone(&payload),
            render_decisions: options.render_decisions,
            decision_scopes: options.decision_scopes,
            callbacks: callbacks.clone(),
        };

        self.lifecycle.on_before_event(&ctx).await?;
        if event.lock().expect("event poisoned").is_empty() {
            warn!("sending an event with no data attached");
        }

        self.consent.await_consent().await?;
        self.lifecycle.on_before_data_collection_request(&ctx).await?;

        // Unload-bound events use the fire-capable endpoint.
        let action = if event.lock().expect("event poisoned").get_document_may_unload() {
            "collect"
        } else {
            "interact"
        };
        self.edge
            .send_request(self.lifecycle.as_ref(), payload, action, callbacks)
            .await
    }
}

fn gateway_meta(org_id: &str) -> Map<String, Value> {
    match json!({ "gateway": { "orgId": org_id } }) {
        Value::Object(map) => map,
        _ => unreachable!("json literal is an object"),
    }
}
