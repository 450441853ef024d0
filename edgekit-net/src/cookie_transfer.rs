//! Cookie transfer between the cookie store and the wire.
//!
//! Outbound: org-scoped stored cookies become `meta.state.entries` on the
//! payload. Inbound: `state:store` handle payloads become cookies. The
//! inbound transfer must complete before any response hook fires so
//! components observe the post-response cookie state.

use crate::payload::Payload;
use crate::response::EdgeResponse;
use edgekit_types::{is_org_cookie, CookieJar, CookieOptions};

/// Copies the org's stored cookies into the payload's state entries.
pub fn cookies_to_payload(jar: &dyn CookieJar, org_id: &str, payload: &Payload) {
    for name in jar.names() {
        if !is_org_cookie(&name, org_id) {
            continue;
        }
        if let Some(value) = jar.get(&name) {
            payload.add_state_entry(&name, &value);
        }
    }
}

/// Stores `state:store` handle entries from the response into the jar.
pub fn response_to_cookies(jar: &dyn CookieJar, response: &EdgeResponse) {
    for entry in response.payloads_by_type("state:store") {
        let (Some(key), Some(value)) = (
            entry.get("key").and_then(|v| v.as_str()),
            entry.get("value").and_then(|v| v.as_str()),
        ) else {
            tracing::debug!(%entry, "ignoring malformed state:store entry");
            continue;
        };
        let options = CookieOptions {
            max_age_secs: entry.get("maxAge").and_then(|v| v.as_u64()),
            domain: None,
        };
        jar.set(key, value, options);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::send::NetworkResponse;
    use edgekit_types::MemoryCookieJar;
    use serde_json::json;

    #[test]
    fn transfers_only_org_scoped_cookies_to_payload() {
        let jar = MemoryCookieJar::new();
        jar.set("kndctr_org_x_identity", "ecid1", CookieOptions::default());
        jar.set("unrelated", "nope", CookieOptions::default());
        let payload = Payload::new();
        cookies_to_payload(&jar, "org@x", &payload);
        let body = payload.to_json();
        let entries = &body["meta"]["state"]["entries"];
        assert_eq!(
            entries,
            &json!([{ "key": "kndctr_org_x_identity", "value": "ecid1" }])
        );
    }

    #[test]
    fn stores_state_entries_from_response() {
        let jar = MemoryCookieJar::new();
        let body = json!({
            "requestId": "r1",
            "handle": [{
                "type": "state:store",
                "payload": [
                    { "key": "kndctr_org_x_consent", "value": "general=in", "maxAge": 15552000 },
                    { "bogus": true }
                ]
            }]
        });
        let response = EdgeResponse::from_network(&NetworkResponse {
            status_code: 200,
            body: body.to_string(),
            parsed_body: Some(body),
        })
        .unwrap();
        response_to_cookies(&jar, &response);
        assert_eq!(
            jar.get("kndctr_org_x_consent"),
            Some("general=in".to_string())
        );
    }
}
