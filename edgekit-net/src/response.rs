//! Parsed and shape-validated edge responses.
//!
//! A response is well-formed iff its body parses as a JSON object carrying
//! a string `requestId` and an array `handle`. Anything else is a
//! `MalformedResponse` and takes the failure path even when the transport
//! returned 2xx.

use crate::send::NetworkResponse;
use edgekit_types::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
struct HandleFragment {
    #[serde(rename = "type")]
    fragment_type: String,
    #[serde(default)]
    payload: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseShape {
    request_id: String,
    handle: Vec<HandleFragment>,
    #[serde(default)]
    warnings: Vec<Value>,
    #[serde(default)]
    errors: Vec<Value>,
}

/// A validated response from the collection server.
#[derive(Debug, Clone)]
pub struct EdgeResponse {
    shape: ResponseShape,
}

impl EdgeResponse {
    /// Validates the network result's parsed body into an `EdgeResponse`.
    pub fn from_network(result: &NetworkResponse) -> Result<Self> {
        let body = result.parsed_body.as_ref().ok_or_else(|| {
            Error::MalformedResponse(format!(
                "Status code {} with a non-JSON response body.",
                result.status_code
            ))
        })?;
        let shape: ResponseShape = serde_json::from_value(body.clone()).map_err(|error| {
            Error::MalformedResponse(format!(
                "Status code {}: response body is missing requestId or handle ({error}).",
                result.status_code
            ))
        })?;
        Ok(Self { shape })
    }

    pub fn request_id(&self) -> &str {
        &self.shape.request_id
    }

    /// All payload entries across handle fragments of the given type, in
    /// document order.
    pub fn payloads_by_type(&self, fragment_type: &str) -> Vec<Value> {
        self.shape
            .handle
            .iter()
            .filter(|fragment| fragment.fragment_type == fragment_type)
            .flat_map(|fragment| fragment.payload.iter().cloned())
            .collect()
    }

    /// First payload entry of the given type, if any.
    pub fn first_payload_by_type(&self, fragment_type: &str) -> Option<Value> {
        self.payloads_by_type(fragment_type).into_iter().next()
    }

    /// Logs body warnings; a non-empty `errors` array fails the request.
    pub fn process_warnings_and_errors(&self) -> Result<()> {
        for warning in &self.shape.warnings {
            tracing::warn!(request_id = %self.shape.request_id, %warning, "server warning");
        }
        if self.shape.errors.is_empty() {
            return Ok(());
        }
        let rendered = self
            .shape
            .errors
            .iter()
            .map(|error| error.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Err(Error::EdgeErrors(rendered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn network_response(body: Value) -> NetworkResponse {
        NetworkResponse {
            status_code: 200,
            body: body.to_string(),
            parsed_body: Some(body),
        }
    }

    #[test]
    fn accepts_minimal_well_formed_body() {
        let response =
            EdgeResponse::from_network(&network_response(json!({ "requestId": "r1", "handle": [] })))
                .unwrap();
        assert_eq!(response.request_id(), "r1");
        assert!(response.payloads_by_type("state:store").is_empty());
    }

    #[test]
    fn rejects_non_json_body() {
        let result = NetworkResponse {
            status_code: 200,
            body: "not json".to_string(),
            parsed_body: None,
        };
        assert!(matches!(
            EdgeResponse::from_network(&result),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn rejects_body_missing_handle() {
        let result = network_response(json!({ "requestId": "r1" }));
        assert!(matches!(
            EdgeResponse::from_network(&result),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn collects_payloads_across_fragments_in_order() {
        let response = EdgeResponse::from_network(&network_response(json!({
            "requestId": "r1",
            "handle": [
                { "type": "state:store", "payload": [{ "key": "a" }] },
                { "type": "identity:persist", "payload": [{ "id": "ecid1" }] },
                { "type": "state:store", "payload": [{ "key": "b" }] }
            ]
        })))
        .unwrap();
        assert_eq!(
            response.payloads_by_type("state:store"),
            vec![json!({ "key": "a" }), json!({ "key": "b" })]
        );
        assert_eq!(
            response.first_payload_by_type("identity:persist"),
            Some(json!({ "id": "ecid1" }))
        );
    }

    #[test]
    fn body_errors_fail_the_request() {
        let response = EdgeResponse::from_network(&network_response(json!({
            "requestId": "r1",
            "handle": [],
            "errors": [{ "code": "invalid-xdm", "message": "Invalid XDM" }]
        })))
        .unwrap();
        let err = response.process_warnings_and_errors().unwrap_err();
        assert!(err.to_string().contains("Invalid XDM"));
    }

    #[test]
    fn warnings_alone_do_not_fail() {
        let response = EdgeResponse::from_network(&network_response(json!({
            "requestId": "r1",
            "handle": [],
            "warnings": [{ "code": "deprecated-field" }]
        })))
        .unwrap();
        assert!(response.process_warnings_and_errors().is_ok());
    }
}
