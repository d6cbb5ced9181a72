use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::endpoint::EndpointKind;

/// Top-level error type for the `hadash-api` crate.
///
/// Covers configuration, transport, and decoding failures of the
/// Home Assistant REST surface. `hadash-core` maps these into
/// domain-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// Neither a local nor an external address is configured.
    #[error("No Home Assistant address configured")]
    NoEndpointsConfigured,

    /// URL parsing error (usually a malformed endpoint address).
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header value could not be built (e.g. a token with control characters).
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A single attempt exceeded the per-call deadline.
    #[error("Request timed out after {after:?}")]
    Timeout { after: Duration },

    /// The caller cancelled the request.
    #[error("Request cancelled")]
    Cancelled,

    /// Every configured endpoint failed.
    #[error("Connection error: {0}")]
    Connection(FailoverError),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error means no endpoint could be reached.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Transport(_) | Self::Timeout { .. }
        )
    }

    /// Returns `true` if the per-call deadline was hit, directly or on
    /// every endpoint of a failover attempt.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(e) => e.is_timeout(),
            Self::Connection(failover) => failover.failures().iter().all(|f| f.error.is_timeout()),
            _ => false,
        }
    }

    /// The per-endpoint failures, if this is a failover error.
    pub fn failover(&self) -> Option<&FailoverError> {
        match self {
            Self::Connection(failover) => Some(failover),
            _ => None,
        }
    }
}

/// One failed attempt against one endpoint.
#[derive(Debug)]
pub struct EndpointFailure {
    pub kind: EndpointKind,
    pub base_url: String,
    pub error: Error,
}

/// Aggregate of every per-endpoint failure of one request, in attempt order.
#[derive(Debug)]
pub struct FailoverError {
    failures: Vec<EndpointFailure>,
}

impl FailoverError {
    pub(crate) fn new(failures: Vec<EndpointFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[EndpointFailure] {
        &self.failures
    }

    /// The failure recorded for the given endpoint, if it was attempted.
    pub fn get(&self, kind: EndpointKind) -> Option<&Error> {
        self.failures
            .iter()
            .find(|f| f.kind == kind)
            .map(|f| &f.error)
    }

    pub fn local(&self) -> Option<&Error> {
        self.get(EndpointKind::Local)
    }

    pub fn external(&self) -> Option<&Error> {
        self.get(EndpointKind::External)
    }
}

impl std::error::Error for FailoverError {}

impl fmt::Display for FailoverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("all endpoints failed")?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(
                f,
                "{sep}{} ({}): {}",
                failure.kind, failure.base_url, failure.error
            )?;
        }
        Ok(())
    }
}
