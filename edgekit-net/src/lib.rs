//! Edge network layer for the edgekit collection client.
//!
//! Owns everything between a fully-prepared request payload and the merged
//! response value handed back to the command's caller:
//! - **Payload**: the per-request wire aggregate
//! - **Transport**: the [`NetworkStrategy`] seam and its `reqwest` impl
//! - **Retry**: bounded immediate re-issue on transient status codes
//! - **Response**: shape validation, handle access, warnings/errors
//! - **Fan-out**: per-request response/failure callback registries and the
//!   [`RequestLifecycle`] seam the pipeline coordinator plugs into
//!
//! The flow through [`EdgeNetwork::send_request`]:
//!
//! 1. `on_before_request` (components may mutate the payload and register
//!    callbacks)
//! 2. domain resolution (first-party vs the shared third-party domain)
//! 3. stored cookies transferred into the payload
//! 4. send with retry
//! 5. on failure: failure hooks run, then the *original* error propagates
//! 6. on success: response cookies stored, warnings/errors processed, then
//!    response hooks run and their results merge into the final value

mod callbacks;
mod cookie_transfer;
mod edge;
mod payload;
mod response;
mod send;
mod transport;

pub use callbacks::{FailureCallback, HookResult, RequestCallbacks, ResponseCallback};
pub use cookie_transfer::{cookies_to_payload, response_to_cookies};
pub use edge::{EdgeNetwork, RequestContext, RequestLifecycle, ID_THIRD_PARTY_DOMAIN};
pub use payload::Payload;
pub use response::EdgeResponse;
pub use send::{is_retryable_http_status_code, NetworkRequester, NetworkResponse, MAX_RETRIES};
pub use transport::{NetworkStrategy, ReqwestStrategy, TransportResponse};
