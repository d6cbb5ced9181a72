//! Flag-aware configuration: the config file plus `GlobalOpts` overrides.

use hadash_config::Config;
use hadash_core::settings::HA_TOKEN;
use hadash_core::{MemorySettings, SettingsStore};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the config file and layer command-line flags on top.
pub fn effective_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = hadash_config::load_config(global.config.as_deref())?;
    apply_overrides(&mut cfg, global);
    cfg.validate()?;
    Ok(cfg)
}

/// Same as [`effective_config`], but fails when no address is configured.
pub fn config_with_endpoint(global: &GlobalOpts) -> Result<Config, CliError> {
    let cfg = effective_config(global)?;
    if !cfg.has_endpoint() {
        return Err(CliError::NoEndpoints {
            path: config_path(global).display().to_string(),
        });
    }
    Ok(cfg)
}

/// Seed the settings store. `--token` beats every configured token source.
pub fn settings_for(cfg: &Config, global: &GlobalOpts) -> Result<MemorySettings, CliError> {
    let settings = cfg.to_settings()?;
    if let Some(ref token) = global.token {
        settings.set(HA_TOKEN, token.clone());
    }
    Ok(settings)
}

pub fn config_path(global: &GlobalOpts) -> std::path::PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(hadash_config::config_path)
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref url) = global.local_url {
        cfg.local_url = Some(url.clone());
    }
    if let Some(ref url) = global.external_url {
        cfg.external_url = Some(url.clone());
    }
    if let Some(timeout) = global.timeout {
        cfg.timeout = timeout;
    }
    if global.insecure {
        cfg.insecure = true;
    }
}
