//! Configuration for an edgekit instance.
//!
//! `ConfigOptions` is the mutable, serde-friendly input handed to the
//! `configure` command; `validate()` turns it into the immutable `Config`
//! shared by reference with every component and the network layer. The
//! config is never mutated after validation.

use crate::consent::ConsentStatus;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Default first-party collection domain.
pub const DEFAULT_EDGE_DOMAIN: &str = "edge.adobedc.net";

/// Default base path prepended to the versioned endpoint path.
pub const DEFAULT_EDGE_BASE_PATH: &str = "ee";

/// Last-chance mutation callback run when an event is serialized.
///
/// Receives mutable views of the event's `{xdm, data}`. Returning an error
/// discards the callback's partial mutations and leaves the event unchanged.
pub type OnBeforeEventSend =
    Arc<dyn Fn(&mut Map<String, Value>, &mut Map<String, Value>) -> Result<()> + Send + Sync>;

/// User-supplied configuration options, prior to validation.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOptions {
    /// Organization identifier, e.g. `53A16ACB5CC1D3760A495C99@AdobeOrg`. Required.
    pub org_id: String,
    /// Datastream/configuration identifier sent on every request. Required.
    pub edge_config_id: String,
    /// First-party collection domain.
    pub edge_domain: Option<String>,
    /// Base path of the collection endpoint.
    pub edge_base_path: Option<String>,
    /// Whether debug logging starts enabled.
    pub debug_enabled: bool,
    /// Consent state assumed before any stored or explicit decision.
    pub default_consent: Option<ConsentStatus>,
    /// Whether to read the legacy `AMCV_{orgId}` cookie for an existing ECID.
    pub id_migration_enabled: Option<bool>,
    /// Whether the first identity request may target the shared third-party domain.
    pub third_party_cookies_enabled: Option<bool>,
    /// Last-chance event mutation callback. Not deserializable; set programmatically.
    #[serde(skip)]
    pub on_before_event_send: Option<OnBeforeEventSend>,
}

impl ConfigOptions {
    /// Validates the options, producing an immutable [`Config`].
    ///
    /// Collects every problem before failing so a misconfigured caller sees
    /// the full list at once.
    pub fn validate(self) -> Result<Config> {
        let mut problems = Vec::new();
        if self.org_id.trim().is_empty() {
            problems.push("'orgId' is required");
        }
        if self.edge_config_id.trim().is_empty() {
            problems.push("'edgeConfigId' is required");
        }
        let edge_domain = self
            .edge_domain
            .unwrap_or_else(|| DEFAULT_EDGE_DOMAIN.to_string());
        if edge_domain.contains('/') || edge_domain.trim().is_empty() {
            problems.push("'edgeDomain' must be a bare domain name");
        }
        if !problems.is_empty() {
            return Err(Error::Config(format!(
                "Invalid configuration: {}.",
                problems.join("; ")
            )));
        }
        Ok(Config {
            org_id: self.org_id,
            edge_config_id: self.edge_config_id,
            edge_domain,
            edge_base_path: self
                .edge_base_path
                .unwrap_or_else(|| DEFAULT_EDGE_BASE_PATH.to_string()),
            debug_enabled: self.debug_enabled,
            default_consent: self.default_consent.unwrap_or(ConsentStatus::In),
            id_migration_enabled: self.id_migration_enabled.unwrap_or(true),
            third_party_cookies_enabled: self.third_party_cookies_enabled.unwrap_or(true),
            on_before_event_send: self.on_before_event_send,
        })
    }
}

/// Validated, immutable instance configuration.
#[derive(Clone)]
pub struct Config {
    pub org_id: String,
    pub edge_config_id: String,
    pub edge_domain: String,
    pub edge_base_path: String,
    pub debug_enabled: bool,
    pub default_consent: ConsentStatus,
    pub id_migration_enabled: bool,
    pub third_party_cookies_enabled: bool,
    pub on_before_event_send: Option<OnBeforeEventSend>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("org_id", &self.org_id)
            .field("edge_config_id", &self.edge_config_id)
            .field("edge_domain", &self.edge_domain)
            .field("edge_base_path", &self.edge_base_path)
            .field("debug_enabled", &self.debug_enabled)
            .field("default_consent", &self.default_consent)
            .field("id_migration_enabled", &self.id_migration_enabled)
            .field(
                "third_party_cookies_enabled",
                &self.third_party_cookies_enabled,
            )
            .field(
                "on_before_event_send",
                &self.on_before_event_send.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ConfigOptions {
        ConfigOptions {
            org_id: "org@example".to_string(),
            edge_config_id: "cfg123".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn validate_applies_defaults() {
        let config = minimal().validate().unwrap();
        assert_eq!(config.edge_domain, DEFAULT_EDGE_DOMAIN);
        assert_eq!(config.edge_base_path, DEFAULT_EDGE_BASE_PATH);
        assert_eq!(config.default_consent, ConsentStatus::In);
        assert!(config.id_migration_enabled);
        assert!(config.third_party_cookies_enabled);
        assert!(!config.debug_enabled);
    }

    #[test]
    fn validate_collects_all_problems() {
        let err = ConfigOptions::default().validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'orgId' is required"));
        assert!(message.contains("'edgeConfigId' is required"));
    }

    #[test]
    fn validate_rejects_domain_with_path() {
        let mut options = minimal();
        options.edge_domain = Some("edge.example.com/path".to_string());
        assert!(options.validate().is_err());
    }

    #[test]
    fn options_deserialize_from_camel_case() {
        let options: ConfigOptions = serde_json::from_value(serde_json::json!({
            "orgId": "org@example",
            "edgeConfigId": "cfg123",
            "edgeDomain": "edge.example.com",
            "defaultConsent": "pending"
        }))
        .unwrap();
        let config = options.validate().unwrap();
        assert_eq!(config.edge_domain, "edge.example.com");
        assert_eq!(config.default_consent, ConsentStatus::Pending);
    }
}
