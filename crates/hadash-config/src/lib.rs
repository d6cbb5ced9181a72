//! Configuration for the hadash companion host.
//!
//! TOML file + `HADASH_` environment, token resolution (env + plaintext),
//! and translation to the transport settings and the initial settings
//! store the companion runs against.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hadash_api::{TlsMode, TransportConfig};
use hadash_core::settings::{EXTERNAL_HA_IP, HA_TOKEN, LOCAL_HA_IP, SENSORS_LIST};
use hadash_core::{MemorySettings, SelectionEntry};

/// Environment variable consulted for the token after `token_env`.
pub const TOKEN_ENV: &str = "HADASH_TOKEN";

const ENV_PREFIX: &str = "HADASH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to encode sensor selection: {0}")]
    Selection(#[from] serde_json::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// LAN base URL (e.g., "http://192.168.1.2:8123").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_url: Option<String>,

    /// Remote base URL (e.g., "https://ha.example.com").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,

    /// Long-lived access token (plaintext; prefer `token_env`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable name containing the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept invalid TLS certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate (PEM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Entity ids selected for display at startup.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sensors: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_url: None,
            external_url: None,
            token: None,
            token_env: None,
            timeout: default_timeout(),
            insecure: false,
            ca_cert: None,
            sensors: Vec::new(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "hadash", "hadash").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("hadash");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load config from defaults, the TOML file and the environment.
///
/// `path` overrides the platform config path. A missing file is not an
/// error; the remaining layers still apply.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX).only(&[
            "local_url",
            "external_url",
            "token",
            "token_env",
            "timeout",
            "insecure",
            "ca_cert",
        ]));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path` (or the platform path).
pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(path)
}

// ── Validation & translation ────────────────────────────────────────

impl Config {
    /// Reject values the companion can never use.
    ///
    /// Endpoint URLs are checked here so a typo surfaces at startup
    /// instead of as a failed attempt on every request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("local_url", &self.local_url),
            ("external_url", &self.external_url),
        ] {
            if let Some(raw) = value {
                url::Url::parse(raw).map_err(|e| ConfigError::Validation {
                    field: field.into(),
                    reason: format!("'{raw}' is not a URL: {e}"),
                })?;
            }
        }
        if self.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        Ok(())
    }

    pub fn has_endpoint(&self) -> bool {
        self.local_url.is_some() || self.external_url.is_some()
    }

    /// TLS mode and per-attempt timeout for the HTTP client.
    pub fn transport(&self) -> TransportConfig {
        let tls = if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };
        TransportConfig::default()
            .with_tls(tls)
            .with_timeout(Duration::from_secs(self.timeout))
    }

    /// The `sensorsList` text for the configured startup selection.
    pub fn selection_json(&self) -> Result<String, ConfigError> {
        let entries: Vec<SelectionEntry> = self
            .sensors
            .iter()
            .map(SelectionEntry::selected)
            .collect();
        Ok(serde_json::to_string(&entries)?)
    }

    /// Seed an in-memory settings store from this config.
    ///
    /// Keys without a configured value are left unset.
    pub fn to_settings(&self) -> Result<MemorySettings, ConfigError> {
        let mut entries: Vec<(&str, String)> = Vec::new();
        if let Some(token) = resolve_token(self) {
            entries.push((HA_TOKEN, token.expose_secret().to_owned()));
        }
        if let Some(ref url) = self.local_url {
            entries.push((LOCAL_HA_IP, url.clone()));
        }
        if let Some(ref url) = self.external_url {
            entries.push((EXTERNAL_HA_IP, url.clone()));
        }
        if !self.sensors.is_empty() {
            entries.push((SENSORS_LIST, self.selection_json()?));
        }
        Ok(MemorySettings::with_values(entries))
    }
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve the bearer token from the process environment and config.
pub fn resolve_token(cfg: &Config) -> Option<SecretString> {
    resolve_token_with(cfg, |name| std::env::var(name).ok())
}

/// Resolve the bearer token with an explicit environment lookup.
///
/// Order: the variable named by `token_env`, then `HADASH_TOKEN`, then
/// the plaintext `token`. Empty values are skipped.
pub fn resolve_token_with<F>(cfg: &Config, lookup: F) -> Option<SecretString>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |v: String| (!v.is_empty()).then_some(v);

    cfg.token_env
        .as_deref()
        .and_then(&lookup)
        .and_then(non_empty)
        .or_else(|| lookup(TOKEN_ENV).and_then(non_empty))
        .or_else(|| cfg.token.clone().and_then(non_empty))
        .map(SecretString::from)
}
