//! Error taxonomy shared by every edgekit crate.
//!
//! All variants carry owned strings so errors are `Clone`: a terminal
//! network error fans out to every registered failure callback while the
//! caller still observes the original error value.

use thiserror::Error;

/// Result type alias using the shared error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the edgekit pipeline.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Missing or invalid configuration, double-configure, use-before-configure.
    #[error("{0}")]
    Config(String),

    /// Bad command options or invalid values.
    #[error("{0}")]
    Validation(String),

    /// Transport-level failure or retries exhausted without a usable response.
    #[error("Network request failed.\nCaused by: {cause}")]
    Network { cause: String },

    /// Response failed shape validation.
    #[error("Unexpected server response.\n{0}")]
    MalformedResponse(String),

    /// The server accepted the request but reported fatal errors in the body.
    #[error("The server responded with the following error(s):\n{0}")]
    EdgeErrors(String),

    /// The user explicitly declined consent.
    #[error("The user declined consent. The request will not be sent.")]
    ConsentDenied,

    /// A component lifecycle hook failed.
    #[error("[{namespace}] {message}")]
    Component { namespace: String, message: String },
}

impl Error {
    /// Wraps a transport cause in a `Network` error.
    pub fn network(cause: impl std::fmt::Display) -> Self {
        Error::Network {
            cause: cause.to_string(),
        }
    }

    /// Wraps a component failure, preserving the component's namespace.
    pub fn component(namespace: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::Component {
            namespace: namespace.into(),
            message: message.to_string(),
        }
    }
}
