//! Command dispatch: bridges CLI args -> companion core -> output formatting.

pub mod catalog;
pub mod check;
pub mod config_cmd;
pub mod sensors;
pub mod serve;
pub mod toggle;

use std::sync::Arc;

use hadash_api::FailoverClient;
use hadash_config::Config;
use hadash_core::{SensorDirectory, SettingsSource, SettingsStore};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a Home Assistant-bound command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Serve => serve::handle(global).await,
        Command::Sensors(args) => sensors::handle(args, global).await,
        Command::Catalog => catalog::handle(global).await,
        Command::Toggle(args) => toggle::handle(args, global).await,
        Command::Check => check::handle(global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        // Completions are handled before dispatch
        Command::Completions(_) => Ok(()),
    }
}

/// Failover client reading addresses and token from `settings`.
pub(crate) fn client_for(
    settings: &Arc<dyn SettingsStore>,
    cfg: &Config,
) -> Result<FailoverClient, CliError> {
    let source = Arc::new(SettingsSource::new(Arc::clone(settings)));
    Ok(FailoverClient::new(
        Arc::clone(&source) as _,
        source,
        &cfg.transport(),
    )?)
}

pub(crate) fn directory_for(
    settings: &Arc<dyn SettingsStore>,
    cfg: &Config,
) -> Result<SensorDirectory, CliError> {
    let client = client_for(settings, cfg)?;
    Ok(SensorDirectory::new(client, Arc::clone(settings)))
}
