//! Per-request wire payload.
//!
//! Built fresh for every request and never reused. Shared with component
//! hooks behind `Arc`, so all mutation goes through interior mutability;
//! hook bodies run to completion between await points, which keeps the
//! short lock sections uncontended in practice.

use edgekit_types::{deep_merge, Error, Event, Result};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct PayloadBody {
    events: Vec<Arc<Mutex<Event>>>,
    meta: Map<String, Value>,
    identity_map: Map<String, Value>,
    state_entries: Vec<Value>,
    consent: Option<Value>,
}

/// Wire-serializable aggregate for one edge request.
#[derive(Default)]
pub struct Payload {
    body: Mutex<PayloadBody>,
    use_id_third_party_domain: AtomicBool,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the outbound event. Data-collection payloads carry exactly one;
    /// consent/identity payloads carry none. The event stays shared with
    /// lifecycle hooks, which may keep mutating it until serialization.
    pub fn add_event(&self, event: Arc<Mutex<Event>>) {
        self.lock().events.push(event);
    }

    /// Deep-merges request-level metadata.
    pub fn merge_meta(&self, meta: &Map<String, Value>) {
        deep_merge(&mut self.lock().meta, meta);
    }

    /// Adds an identity under a namespace (e.g. `ECID`).
    pub fn add_identity(&self, namespace: &str, id: &str) {
        let mut body = self.lock();
        let entries = body
            .identity_map
            .entry(namespace.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = entries {
            list.push(json!({ "id": id }));
        }
    }

    /// True when an identity exists for the namespace.
    pub fn has_identity(&self, namespace: &str) -> bool {
        self.lock().identity_map.contains_key(namespace)
    }

    /// Adds a stored cookie-state entry replayed to the server.
    pub fn add_state_entry(&self, key: &str, value: &str) {
        self.lock()
            .state_entries
            .push(json!({ "key": key, "value": value }));
    }

    /// Sets the consent preferences carried by a set-consent request.
    pub fn set_consent(&self, consent: Value) {
        self.lock().consent = Some(consent);
    }

    /// Routes this request to the shared third-party identity domain.
    /// One-way; inspected after `on_before_request` completes.
    pub fn set_use_id_third_party_domain(&self) {
        self.use_id_third_party_domain.store(true, Ordering::SeqCst);
    }

    pub fn use_id_third_party_domain(&self) -> bool {
        self.use_id_third_party_domain.load(Ordering::SeqCst)
    }

    /// Builds the JSON body. Serializing an event runs its last-chance
    /// callback; empty sections are omitted.
    pub fn to_json(&self) -> Value {
        let body = self.lock();
        let mut out = Map::new();
        if !body.events.is_empty() {
            out.insert(
                "events".to_string(),
                Value::Array(
                    body.events
                        .iter()
                        .map(|event| event.lock().expect("event poisoned").to_json())
                        .collect(),
                ),
            );
        }
        if !body.identity_map.is_empty() {
            out.insert(
                "xdm".to_string(),
                json!({ "identityMap": Value::Object(body.identity_map.clone()) }),
            );
        }
        let mut meta = body.meta.clone();
        if !body.state_entries.is_empty() {
            deep_merge(
                &mut meta,
                &to_object(json!({ "state": { "entries": body.state_entries.clone() } })),
            );
        }
        if !meta.is_empty() {
            out.insert("meta".to_string(), Value::Object(meta));
        }
        if let Some(consent) = &body.consent {
            out.insert("consent".to_string(), consent.clone());
        }
        Value::Object(out)
    }

    /// Serializes the body to the wire text.
    pub fn serialize(&self) -> Result<String> {
        serde_json::to_string(&self.to_json())
            .map_err(|error| Error::Validation(format!("Could not serialize payload: {error}")))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PayloadBody> {
        self.body.lock().expect("payload poisoned")
    }
}

fn to_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("json literal is an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_payload_serializes_to_empty_object() {
        assert_eq!(Payload::new().to_json(), json!({}));
    }

    #[test]
    fn payload_carries_events_identity_and_state() {
        let payload = Payload::new();
        let mut event = Event::new();
        event.set_user_data(match json!({ "a": 1 }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        });
        payload.add_event(Arc::new(Mutex::new(event)));
        payload.add_identity("ECID", "12345");
        payload.add_state_entry("kndctr_org_consent", "general=in");
        payload.merge_meta(&to_object(json!({ "gateway": { "orgId": "org@x" } })));

        assert_eq!(
            payload.to_json(),
            json!({
                "events": [{ "data": { "a": 1 } }],
                "xdm": { "identityMap": { "ECID": [{ "id": "12345" }] } },
                "meta": {
                    "gateway": { "orgId": "org@x" },
                    "state": {
                        "entries": [{ "key": "kndctr_org_consent", "value": "general=in" }]
                    }
                }
            })
        );
    }

    #[test]
    fn third_party_domain_flag_is_one_way() {
        let payload = Payload::new();
        assert!(!payload.use_id_third_party_domain());
        payload.set_use_id_third_party_domain();
        assert!(payload.use_id_third_party_domain());
    }
}
