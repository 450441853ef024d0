//! The privacy component: stored-consent seeding, the `setConsent` command
//! and gate refresh on every response.

use crate::component::{Component, ComponentTools};
use crate::consent::ConsentGate;
use crate::lifecycle::Lifecycle;
use async_trait::async_trait;
use edgekit_net::{EdgeNetwork, EdgeResponse, HookResult, Payload, RequestCallbacks};
use edgekit_types::{
    consent_cookie_name, parse_consent_cookie, Config, ConsentStatus, CookieJar, Error, Result,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

pub struct Privacy {
    config: Arc<Config>,
    jar: Arc<dyn CookieJar>,
    consent: Arc<ConsentGate>,
    edge: Mutex<Weak<EdgeNetwork>>,
    lifecycle: Mutex<Weak<Lifecycle>>,
}

impl Privacy {
    pub fn new(config: Arc<Config>, jar: Arc<dyn CookieJar>, consent: Arc<ConsentGate>) -> Self {
        Self {
            config,
            jar,
            consent,
            edge: Mutex::new(Weak::new()),
            lifecycle: Mutex::new(Weak::new()),
        }
    }

    /// Applies the stored consent decision to the gate, when one exists.
    fn refresh_gate_from_cookie(&self) -> bool {
        let Some(value) = self.jar.get(&consent_cookie_name(&self.config.org_id)) else {
            return false;
        };
        match parse_consent_cookie(&value) {
            Some(status) => {
                self.consent.update(status);
                true
            }
            None => false,
        }
    }

    async fn set_consent(&self, options: Value) -> Result<Value> {
        let purposes = options
            .get("purposes")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| {
                Error::Validation(
                    "The setConsent command requires a 'purposes' object.".to_string(),
                )
            })?;
        let general = purposes
            .get("general")
            .and_then(Value::as_str)
            .and_then(ConsentStatus::parse)
            .filter(|status| *status != ConsentStatus::Pending)
            .ok_or_else(|| {
                Error::Validation(
                    "The setConsent command requires 'purposes.general' of 'in' or 'out'."
                        .to_string(),
                )
            })?;

        let edge = self.edge()?;
        let lifecycle = self.lifecycle()?;
        let payload = Arc::new(Payload::new());
        payload.set_consent(json!([{
            "standard": "Adobe",
            "version": "1.0",
            "value": purposes,
        }]));

        // Consent submission bypasses the event pipeline and its gate;
        // otherwise an opt-in could never get through a pending gate.
        edge.send_request(
            lifecycle.as_ref(),
            payload,
            "privacy/set-consent",
            RequestCallbacks::new(),
        )
        .await?;

        // The server's stored decision wins; fall back to what was requested.
        if !self.refresh_gate_from_cookie() {
            self.consent.update(general);
        }
        Ok(json!({}))
    }

    fn edge(&self) -> Result<Arc<EdgeNetwork>> {
        self.edge
            .lock()
            .expect("collaborator slot poisoned")
            .upgrade()
            .ok_or_else(|| Error::Config("The library instance has been torn down.".to_string()))
    }

    fn lifecycle(&self) -> Result<Arc<Lifecycle>> {
        self.lifecycle
            .lock()
            .expect("collaborator slot poisoned")
            .upgrade()
            .ok_or_else(|| Error::Config("The library instance has been torn down.".to_string()))
    }
}

#[async_trait]
impl Component for Privacy {
    fn namespace(&self) -> &'static str {
        "Privacy"
    }

    fn on_components_registered(&self, tools: &ComponentTools) {
        *self.edge.lock().expect("collaborator slot poisoned") = Arc::downgrade(&tools.edge);
        *self.lifecycle.lock().expect("collaborator slot poisoned") =
            Arc::downgrade(&tools.lifecycle);
        if self.refresh_gate_from_cookie() {
            debug!("consent gate seeded from the stored consent cookie");
        }
    }

    fn command_names(&self) -> &'static [&'static str] {
        &["setConsent"]
    }

    async fn run_command(&self, name: &str, options: Value) -> Result<Value> {
        match name {
            "setConsent" => self.set_consent(options).await,
            _ => Err(Error::component(
                self.namespace(),
                format!("The {name} command is not implemented."),
            )),
        }
    }

    async fn on_response(&self, _response: &EdgeResponse) -> HookResult {
        // The response may have stored a fresh consent cookie; reflect it.
        self.refresh_gate_from_cookie();
        Ok(None)
    }
}
