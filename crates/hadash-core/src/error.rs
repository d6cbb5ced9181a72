// ── Core error types ──
//
// Domain-level errors from hadash-core. Device-facing responses carry
// the `Display` text of these, so messages are written for a user.
// The `From<hadash_api::Error>` impl translates transport-layer errors.

use std::time::Duration;

use thiserror::Error;

use hadash_api::{EndpointKind, FailoverError};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("No Home Assistant address configured")]
    NoEndpointsConfigured,

    #[error("Connection error: {source}")]
    Connection {
        #[source]
        source: FailoverError,
    },

    #[error("Request timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Request cancelled")]
    Cancelled,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Invalid JSON: {message}")]
    Decode { message: String },

    // ── Handler errors ───────────────────────────────────────────────
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unsupported method: {method}")]
    UnsupportedMethod { method: String },

    #[error("Device channel closed")]
    ChannelClosed,

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if no configured endpoint could be reached.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// The failure recorded for one endpoint, if this is a connection error.
    pub fn endpoint_failure(&self, kind: EndpointKind) -> Option<&hadash_api::Error> {
        match self {
            Self::Connection { source } => source.get(kind),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<hadash_api::Error> for CoreError {
    fn from(err: hadash_api::Error) -> Self {
        match err {
            hadash_api::Error::NoEndpointsConfigured => CoreError::NoEndpointsConfigured,
            hadash_api::Error::Connection(source) => CoreError::Connection { source },
            hadash_api::Error::Timeout { after } => CoreError::Timeout { after },
            hadash_api::Error::Cancelled => CoreError::Cancelled,
            hadash_api::Error::Deserialization { message, body: _ } => {
                CoreError::Decode { message }
            }
            hadash_api::Error::Transport(e) => CoreError::Api {
                message: e.to_string(),
            },
            hadash_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            hadash_api::Error::InvalidHeader(message) | hadash_api::Error::Tls(message) => {
                CoreError::Config { message }
            }
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Decode {
            message: err.to_string(),
        }
    }
}
