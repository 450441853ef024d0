//! Core type definitions for the edgekit collection client.
//!
//! This crate defines the fundamental, component-agnostic types used
//! throughout the pipeline:
//! - Validated, immutable configuration
//! - The `Event` value object (XDM / data / meta / query accumulation)
//! - JSON merge helpers with the pipeline's deep/shallow semantics
//! - The cookie-jar seam and org-scoped cookie naming
//! - Consent values and consent-cookie parsing
//!
//! All component-specific behavior (identity bootstrap, consent gating,
//! command dispatch) belongs in `edgekit-core`, not here.

mod config;
mod consent;
mod cookies;
mod error;
mod event;
mod merge;

pub use config::{Config, ConfigOptions, OnBeforeEventSend};
pub use consent::{parse_consent_cookie, ConsentStatus};
pub use cookies::{
    consent_cookie_name, identity_cookie_name, is_org_cookie, legacy_identity_cookie_name,
    sanitize_org_id, CookieJar, CookieOptions, MemoryCookieJar,
};
pub use error::{Error, Result};
pub use event::Event;
pub use merge::{deep_merge, shallow_merge};
