//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use hadash_config::ConfigError;
use hadash_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONFIG: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach Home Assistant")]
    #[diagnostic(
        code(hadash::connection_failed),
        help(
            "{detail}\n\
             Check that Home Assistant is running and that the addresses are right.\n\
             Try: hadash check -v"
        )
    )]
    ConnectionFailed { detail: String },

    #[error("No Home Assistant address configured")]
    #[diagnostic(
        code(hadash::no_endpoints),
        help(
            "Pass --local-url and/or --external-url, or set local_url / external_url in\n\
             {path}"
        )
    )]
    NoEndpoints { path: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(hadash::timeout),
        help("Increase the timeout with --timeout or check Home Assistant responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Home Assistant rejected the access token")]
    #[diagnostic(
        code(hadash::auth_failed),
        help(
            "Create a long-lived access token in your Home Assistant profile and pass it\n\
             with --token or the HADASH_TOKEN environment variable."
        )
    )]
    AuthFailed,

    // ── Device responses ─────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(hadash::request_failed))]
    RequestFailed { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hadash::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(hadash::config),
        help("Check the config file with: hadash config show")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(hadash::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed => exit_code::AUTH,
            Self::Validation { .. } => exit_code::USAGE,
            Self::NoEndpoints { .. } | Self::Config(_) => exit_code::CONFIG,
            Self::RequestFailed { .. } | Self::Io(_) | Self::Json(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

/// Stands in for the config path where the `--config` flag is out of reach.
const CONFIG_FILE_HINT: &str = "the config file (see `hadash config path`)";

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NoEndpointsConfigured => CliError::NoEndpoints {
                path: CONFIG_FILE_HINT.to_owned(),
            },
            CoreError::Connection { ref source } => {
                let all_timed_out = source
                    .failures()
                    .iter()
                    .all(|f| f.error.is_timeout());
                if all_timed_out {
                    CliError::Timeout {
                        seconds: source
                            .failures()
                            .iter()
                            .find_map(|f| match f.error {
                                hadash_api::Error::Timeout { after } => Some(after.as_secs()),
                                _ => None,
                            })
                            .unwrap_or_default(),
                    }
                } else {
                    CliError::ConnectionFailed {
                        detail: source.to_string(),
                    }
                }
            }
            CoreError::Timeout { after } => CliError::Timeout {
                seconds: after.as_secs(),
            },
            CoreError::Config { message } => CliError::Validation {
                field: "address".into(),
                reason: message,
            },
            other => CliError::RequestFailed {
                message: other.to_string(),
            },
        }
    }
}

impl From<hadash_api::Error> for CliError {
    fn from(err: hadash_api::Error) -> Self {
        CoreError::from(err).into()
    }
}
