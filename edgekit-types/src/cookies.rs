//! Cookie-jar seam and org-scoped cookie naming.
//!
//! The pipeline never touches a browser cookie store directly; it talks to
//! a [`CookieJar`] collaborator. [`MemoryCookieJar`] is the in-process
//! implementation used by tests and embedders without a real store.

use std::collections::HashMap;
use std::sync::Mutex;

/// Prefix for cookies written by the collection server.
const COOKIE_PREFIX: &str = "kndctr";

/// Options applied when setting a cookie.
#[derive(Debug, Clone, Default)]
pub struct CookieOptions {
    /// Lifetime in seconds; `None` means session-scoped.
    pub max_age_secs: Option<u64>,
    /// Domain to scope the cookie to, when the store supports it.
    pub domain: Option<String>,
}

/// Minimal cookie-store collaborator interface.
pub trait CookieJar: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str, options: CookieOptions);
    fn remove(&self, name: &str);
    /// Names of all visible cookies. Stores that cannot enumerate may
    /// return an empty list; only state replay depends on it.
    fn names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// In-memory cookie jar. Ignores domain scoping and expiry.
#[derive(Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<HashMap<String, String>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies.lock().expect("cookie jar poisoned").get(name).cloned()
    }

    fn set(&self, name: &str, value: &str, _options: CookieOptions) {
        self.cookies
            .lock()
            .expect("cookie jar poisoned")
            .insert(name.to_string(), value.to_string());
    }

    fn remove(&self, name: &str) {
        self.cookies.lock().expect("cookie jar poisoned").remove(name);
    }

    fn names(&self) -> Vec<String> {
        self.cookies
            .lock()
            .expect("cookie jar poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

/// Replaces characters that are unsafe in cookie names (`@`, `.`) with `_`.
pub fn sanitize_org_id(org_id: &str) -> String {
    org_id.replace(['@', '.'], "_")
}

/// Name of the first-party identity cookie for an org.
pub fn identity_cookie_name(org_id: &str) -> String {
    format!("{COOKIE_PREFIX}_{}_identity", sanitize_org_id(org_id))
}

/// Name of the stored consent cookie for an org.
pub fn consent_cookie_name(org_id: &str) -> String {
    format!("{COOKIE_PREFIX}_{}_consent", sanitize_org_id(org_id))
}

/// Name of the legacy visitor cookie consulted for ECID migration. Read-only.
pub fn legacy_identity_cookie_name(org_id: &str) -> String {
    format!("AMCV_{org_id}")
}

/// True for cookies the collection server owns for this org, i.e. the ones
/// transferred into outbound request payloads.
pub fn is_org_cookie(name: &str, org_id: &str) -> bool {
    name.starts_with(&format!("{COOKIE_PREFIX}_{}_", sanitize_org_id(org_id)))
}
