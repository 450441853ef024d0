//! The data collection component: serves the `event` command.

use crate::component::{Component, ComponentTools};
use crate::event_manager::{EventManager, SendEventOptions};
use async_trait::async_trait;
use edgekit_types::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::{Mutex, Weak};
use tracing::warn;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct EventOptions {
    #[serde(rename = "type")]
    event_type: Option<String>,
    xdm: Option<Map<String, Value>>,
    data: Option<Map<String, Value>>,
    document_unloading: bool,
    render_decisions: bool,
    decision_scopes: Vec<String>,
}

#[derive(Default)]
pub struct DataCollector {
    event_manager: Mutex<Weak<EventManager>>,
}

impl DataCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn event_manager(&self) -> Result<std::sync::Arc<EventManager>> {
        self.event_manager
            .lock()
            .expect("collaborator slot poisoned")
            .upgrade()
            .ok_or_else(|| Error::Config("The library instance has been torn down.".to_string()))
    }
}

#[async_trait]
impl Component for DataCollector {
    fn namespace(&self) -> &'static str {
        "DataCollector"
    }

    fn on_components_registered(&self, tools: &ComponentTools) {
        *self.event_manager.lock().expect("collaborator slot poisoned") =
            std::sync::Arc::downgrade(&tools.event_manager);
    }

    fn command_names(&self) -> &'static [&'static str] {
        &["event"]
    }

    async fn run_command(&self, _name: &str, options: Value) -> Result<Value> {
        let options: EventOptions = serde_json::from_value(options).map_err(|err| {
            Error::Validation(format!("Invalid event command options: {err}."))
        })?;
        if options.xdm.is_none() && options.data.is_none() {
            warn!("the event command was called without 'xdm' or 'data'");
        }

        let manager = self.event_manager()?;
        let mut event = manager.create_event();
        if let Some(event_type) = options.event_type {
            event.merge_xdm(&object(json!({ "eventType": event_type })));
        }
        if let Some(xdm) = options.xdm {
            event.set_user_xdm(xdm);
        }
        if let Some(data) = options.data {
            event.set_user_data(data);
        }
        if options.document_unloading {
            event.document_may_unload();
        }

        manager
            .send_event(
                event,
                SendEventOptions {
                    render_decisions: options.render_decisions,
                    decision_scopes: options.decision_scopes,
                },
            )
            .await
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("json literal is an object"),
    }
}
