//! The outbound event value object.
//!
//! An `Event` accumulates XDM fields, free-form data, metadata and query
//! directives over the course of the `on_before_event` phase, then
//! serializes once when the network layer builds the request body.
//!
//! Merge semantics:
//! - `merge_xdm` is deep, last-write-wins per leaf key
//! - user XDM (`set_user_xdm`) is merged *last* so user data always wins
//!   over system-injected XDM
//! - `set_user_data` replaces wholesale, last call wins
//! - `merge_meta` / `merge_query` deep-merge in call order

use crate::error::Result;
use crate::merge::deep_merge;
use serde_json::{Map, Value};

type LastChanceCallback =
    Box<dyn Fn(&mut Map<String, Value>, &mut Map<String, Value>) -> Result<()> + Send + Sync>;

/// One outbound telemetry/interaction record.
#[derive(Default)]
pub struct Event {
    xdm: Map<String, Value>,
    user_xdm: Option<Map<String, Value>>,
    user_data: Option<Map<String, Value>>,
    meta: Map<String, Value>,
    query: Map<String, Value>,
    document_may_unload: bool,
    last_chance_callback: Option<LastChanceCallback>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep-merges system-injected XDM fields.
    pub fn merge_xdm(&mut self, xdm: &Map<String, Value>) {
        deep_merge(&mut self.xdm, xdm);
    }

    /// Stores the caller's XDM. Cloned; the caller's map is never mutated.
    /// Merged after all `merge_xdm` contributions at serialization time.
    pub fn set_user_xdm(&mut self, xdm: Map<String, Value>) {
        self.user_xdm = Some(xdm);
    }

    /// Stores the caller's free-form data. Last call wins.
    pub fn set_user_data(&mut self, data: Map<String, Value>) {
        self.user_data = Some(data);
    }

    /// Deep-merges request metadata.
    pub fn merge_meta(&mut self, meta: &Map<String, Value>) {
        deep_merge(&mut self.meta, meta);
    }

    /// Deep-merges personalization query directives.
    pub fn merge_query(&mut self, query: &Map<String, Value>) {
        deep_merge(&mut self.query, query);
    }

    /// Marks the event as possibly outliving the document. One-way.
    pub fn document_may_unload(&mut self) {
        self.document_may_unload = true;
    }

    pub fn get_document_may_unload(&self) -> bool {
        self.document_may_unload
    }

    /// Installs the callback run at serialization time with mutable views of
    /// `{xdm, data}`. An error return discards the callback's partial
    /// mutations and leaves the serialized event unchanged.
    pub fn set_last_chance_callback(&mut self, callback: LastChanceCallback) {
        self.last_chance_callback = Some(callback);
    }

    /// True when nothing has been recorded on the event.
    pub fn is_empty(&self) -> bool {
        self.xdm.is_empty()
            && self.user_xdm.as_ref().map_or(true, Map::is_empty)
            && self.user_data.as_ref().map_or(true, Map::is_empty)
            && self.meta.is_empty()
            && self.query.is_empty()
    }

    /// Serializes the event, applying user XDM last and then the last-chance
    /// callback. Empty sections are omitted.
    pub fn to_json(&self) -> Value {
        let mut xdm = self.xdm.clone();
        if let Some(user_xdm) = &self.user_xdm {
            deep_merge(&mut xdm, user_xdm);
        }
        let mut data = self.user_data.clone().unwrap_or_default();

        if let Some(callback) = &self.last_chance_callback {
            // Run the callback against scratch copies so a failure cannot
            // leave the event partially mutated.
            let mut xdm_scratch = xdm.clone();
            let mut data_scratch = data.clone();
            match callback(&mut xdm_scratch, &mut data_scratch) {
                Ok(()) => {
                    xdm = xdm_scratch;
                    data = data_scratch;
                }
                Err(error) => {
                    tracing::error!(%error, "onBeforeEventSend callback failed; discarding its changes");
                }
            }
        }

        let mut out = Map::new();
        if !xdm.is_empty() {
            out.insert("xdm".to_string(), Value::Object(xdm));
        }
        if !data.is_empty() {
            out.insert("data".to_string(), Value::Object(data));
        }
        if !self.meta.is_empty() {
            out.insert("meta".to_string(), Value::Object(self.meta.clone()));
        }
        if !self.query.is_empty() {
            out.insert("query".to_string(), Value::Object(self.query.clone()));
        }
        Value::Object(out)
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("xdm", &self.xdm)
            .field("user_xdm", &self.user_xdm)
            .field("user_data", &self.user_data)
            .field("meta", &self.meta)
            .field("query", &self.query)
            .field("document_may_unload", &self.document_may_unload)
            .finish_non_exhaustive()
    }
}
