//! The identity component: first-visit ECID bootstrap, cookie persistence,
//! legacy-cookie migration and the identity commands.
//!
//! The first request of a visit has no ECID; it is sent (optionally via the
//! shared third-party domain) and every request started before its response
//! arrives is delayed on a shared signal. The signal always resolves, never
//! fails: if the first response carries no identity, the queued requests
//! proceed without identity context rather than erroring.

use crate::component::{Component, ComponentTools};
use crate::event_manager::{EventManager, SendEventOptions};
use crate::lifecycle::Lifecycle;
use async_trait::async_trait;
use edgekit_net::{EdgeNetwork, EdgeResponse, HookResult, Payload, RequestCallbacks, RequestContext};
use edgekit_types::{
    identity_cookie_name, legacy_identity_cookie_name, sanitize_org_id, Config, CookieJar,
    CookieOptions, Error, Result,
};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Identity namespace for the experience cloud ID.
pub const ECID_NAMESPACE: &str = "ECID";

/// Identity cookie lifetime: 395 days, matching the server default.
const IDENTITY_COOKIE_MAX_AGE_SECS: u64 = 34_128_000;

#[derive(Clone, Copy, PartialEq)]
enum BootstrapState {
    NoIdentity,
    AwaitingFirstResponse,
    Established,
}

pub struct Identity {
    config: Arc<Config>,
    jar: Arc<dyn CookieJar>,
    state: Mutex<BootstrapState>,
    settled: watch::Sender<bool>,
    edge: Mutex<Weak<EdgeNetwork>>,
    lifecycle: Mutex<Weak<Lifecycle>>,
    event_manager: Mutex<Weak<EventManager>>,
}

impl Identity {
    pub fn new(config: Arc<Config>, jar: Arc<dyn CookieJar>) -> Self {
        let (settled, _) = watch::channel(false);
        Self {
            config,
            jar,
            state: Mutex::new(BootstrapState::NoIdentity),
            settled,
            edge: Mutex::new(Weak::new()),
            lifecycle: Mutex::new(Weak::new()),
            event_manager: Mutex::new(Weak::new()),
        }
    }

    fn stored_ecid(&self) -> Option<String> {
        self.jar.get(&identity_cookie_name(&self.config.org_id))
    }

    /// ECID from the legacy visitor cookie (`...|MCMID|<id>|...`), if any.
    fn legacy_ecid(&self) -> Option<String> {
        let value = self
            .jar
            .get(&legacy_identity_cookie_name(&self.config.org_id))?;
        let mut fields = value.split('|');
        while let Some(field) = fields.next() {
            if field == "MCMID" {
                return fields.next().filter(|id| !id.is_empty()).map(str::to_string);
            }
        }
        None
    }

    fn set_state(&self, state: BootstrapState) {
        *self.state.lock().expect("identity state poisoned") = state;
    }

    /// Registers the callbacks that settle the shared signal once the first
    /// request's outcome is known, releasing any delayed requests.
    fn arm_first_request(&self, ctx: &RequestContext) {
        if self.config.third_party_cookies_enabled {
            ctx.payload.set_use_id_third_party_domain();
        }
        if self.config.id_migration_enabled {
            if let Some(legacy) = self.legacy_ecid() {
                debug!("migrating ECID from the legacy visitor cookie");
                ctx.payload.add_identity(ECID_NAMESPACE, &legacy);
            }
        }

        let jar = Arc::clone(&self.jar);
        let org_id = self.config.org_id.clone();
        let settled = self.settled.clone();
        ctx.callbacks.on_response(Box::new(move |_response| {
            Box::pin(async move {
                if jar.get(&identity_cookie_name(&org_id)).is_none() {
                    warn!(
                        "An identity was not set properly. Please verify that the org ID \
                         {org_id} configured matches the org ID of the datastream."
                    );
                }
                let _ = settled.send(true);
                Ok(None)
            })
        }));
        let settled = self.settled.clone();
        ctx.callbacks.on_request_failure(Box::new(move |_error| {
            Box::pin(async move {
                let _ = settled.send(true);
                Ok(())
            })
        }));
    }

    async fn await_first_response(&self) {
        debug!("Delaying request while retrieving ECID from server.");
        let mut rx = self.settled.subscribe();
        // The sender lives as long as this component, so this cannot fail
        // while a request is in flight.
        let _ = rx.wait_for(|settled| *settled).await;
        debug!("Resuming previously delayed request.");
    }

    fn edge(&self) -> Result<Arc<EdgeNetwork>> {
        upgrade(&self.edge)
    }

    fn lifecycle(&self) -> Result<Arc<Lifecycle>> {
        upgrade(&self.lifecycle)
    }

    fn event_manager(&self) -> Result<Arc<EventManager>> {
        upgrade(&self.event_manager)
    }

    async fn get_identity(&self) -> Result<Value> {
        if self.stored_ecid().is_none() {
            debug!("no established identity; issuing an acquisition request");
            let edge = self.edge()?;
            let lifecycle = self.lifecycle()?;
            edge.send_request(
                lifecycle.as_ref(),
                Arc::new(Payload::new()),
                "identity/acquire",
                RequestCallbacks::new(),
            )
            .await?;
        }
        Ok(json!({ "identity": { ECID_NAMESPACE: self.stored_ecid() } }))
    }

    async fn sync_identity(&self, options: Value) -> Result<Value> {
        let customer_ids = options
            .get("customerIds")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| {
                Error::Validation(
                    "The syncIdentity command requires a 'customerIds' object.".to_string(),
                )
            })?;

        let hash = hash_customer_ids(&customer_ids)?;
        let hash_cookie = synced_ids_cookie_name(&self.config.org_id);
        if self.jar.get(&hash_cookie).as_deref() == Some(hash.as_str()) {
            debug!("customer IDs unchanged since the last sync; skipping");
            return Ok(json!({}));
        }

        let manager = self.event_manager()?;
        let mut event = manager.create_event();
        event.merge_meta(&object(
            json!({ "identity": { "customerIds": customer_ids } }),
        ));
        let result = manager.send_event(event, SendEventOptions::default()).await?;
        self.jar.set(&hash_cookie, &hash, CookieOptions::default());
        Ok(result)
    }
}

#[async_trait]
impl Component for Identity {
    fn namespace(&self) -> &'static str {
        "Identity"
    }

    fn on_components_registered(&self, tools: &ComponentTools) {
        *self.edge.lock().expect("collaborator slot poisoned") = Arc::downgrade(&tools.edge);
        *self.lifecycle.lock().expect("collaborator slot poisoned") =
            Arc::downgrade(&tools.lifecycle);
        *self.event_manager.lock().expect("collaborator slot poisoned") =
            Arc::downgrade(&tools.event_manager);
    }

    fn command_names(&self) -> &'static [&'static str] {
        &["getIdentity", "syncIdentity"]
    }

    async fn run_command(&self, name: &str, options: Value) -> Result<Value> {
        match name {
            "getIdentity" => self.get_identity().await,
            "syncIdentity" => self.sync_identity(options).await,
            _ => Err(Error::component(
                self.namespace(),
                format!("The {name} command is not implemented."),
            )),
        }
    }

    async fn on_before_request(&self, ctx: &RequestContext) -> HookResult {
        if let Some(ecid) = self.stored_ecid() {
            ctx.payload.add_identity(ECID_NAMESPACE, &ecid);
            self.set_state(BootstrapState::Established);
            return Ok(None);
        }

        enum NoCookie {
            FirstRequest,
            Delay,
            Proceed,
        }

        let action = {
            let mut state = self.state.lock().expect("identity state poisoned");
            match *state {
                BootstrapState::NoIdentity => {
                    *state = BootstrapState::AwaitingFirstResponse;
                    NoCookie::FirstRequest
                }
                BootstrapState::AwaitingFirstResponse => NoCookie::Delay,
                // Cookie vanished after establishment; proceed identity-less
                // without re-entering the bootstrap handshake.
                BootstrapState::Established => NoCookie::Proceed,
            }
        };

        match action {
            NoCookie::FirstRequest => self.arm_first_request(ctx),
            NoCookie::Delay => {
                self.await_first_response().await;
                if let Some(ecid) = self.stored_ecid() {
                    ctx.payload.add_identity(ECID_NAMESPACE, &ecid);
                }
            }
            NoCookie::Proceed => {}
        }
        Ok(None)
    }

    async fn on_response(&self, response: &EdgeResponse) -> HookResult {
        if let Some(payload) = response.first_payload_by_type("identity:persist") {
            if let Some(id) = payload.get("id").and_then(Value::as_str) {
                self.jar.set(
                    &identity_cookie_name(&self.config.org_id),
                    id,
                    CookieOptions {
                        max_age_secs: Some(IDENTITY_COOKIE_MAX_AGE_SECS),
                        domain: None,
                    },
                );
                self.set_state(BootstrapState::Established);
                let _ = self.settled.send(true);
            }
        }
        Ok(None)
    }
}

fn upgrade<T>(slot: &Mutex<Weak<T>>) -> Result<Arc<T>> {
    slot.lock()
        .expect("collaborator slot poisoned")
        .upgrade()
        .ok_or_else(|| Error::Config("The library instance has been torn down.".to_string()))
}

fn synced_ids_cookie_name(org_id: &str) -> String {
    format!("cidh_{}", sanitize_org_id(org_id))
}

/// Deterministic digest of the synced customer IDs (serde_json serializes
/// object keys in sorted order).
fn hash_customer_ids(customer_ids: &Map<String, Value>) -> Result<String> {
    let serialized = serde_json::to_string(&Value::Object(customer_ids.clone()))
        .map_err(|err| Error::Validation(format!("Could not serialize customer IDs: {err}")))?;
    Ok(hex::encode(Sha256::digest(serialized.as_bytes())))
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("json literal is an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgekit_types::MemoryCookieJar;

    fn config() -> Arc<Config> {
        Arc::new(
            edgekit_types::ConfigOptions {
                org_id: "org@x".to_string(),
                edge_config_id: "cfg".to_string(),
                ..Default::default()
            }
            .validate()
            .unwrap(),
        )
    }

    #[test]
    fn parses_ecid_out_of_the_legacy_cookie() {
        let jar = Arc::new(MemoryCookieJar::new());
        jar.set(
            "AMCV_org@x",
            "179643557|MCMID|1234|MCAID|NONE",
            CookieOptions::default(),
        );
        let identity = Identity::new(config(), jar);
        assert_eq!(identity.legacy_ecid(), Some("1234".to_string()));
    }

    #[test]
    fn legacy_cookie_without_mcmid_yields_nothing() {
        let jar = Arc::new(MemoryCookieJar::new());
        jar.set("AMCV_org@x", "a|b|c", CookieOptions::default());
        let identity = Identity::new(config(), jar);
        assert_eq!(identity.legacy_ecid(), None);
    }

    #[test]
    fn customer_id_hash_is_order_insensitive() {
        let first = object(json!({ "email": { "id": "e" }, "crm": { "id": "c" } }));
        let second = object(json!({ "crm": { "id": "c" }, "email": { "id": "e" } }));
        assert_eq!(
            hash_customer_ids(&first).unwrap(),
            hash_customer_ids(&second).unwrap()
        );
        let changed = object(json!({ "crm": { "id": "other" } }));
        assert_ne!(
            hash_customer_ids(&first).unwrap(),
            hash_customer_ids(&changed).unwrap()
        );
    }
}
