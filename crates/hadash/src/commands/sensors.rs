//! Sensors command handler.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use hadash_core::settings::SENSORS_LIST;
use hadash_core::{SelectionEntry, SettingsStore};

use crate::cli::{GlobalOpts, SensorsArgs};
use crate::config;
use crate::error::CliError;
use crate::output::{self, SensorRow};

pub async fn handle(args: SensorsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::config_with_endpoint(global)?;
    let settings: Arc<dyn SettingsStore> = Arc::new(config::settings_for(&cfg, global)?);

    if !args.entities.is_empty() {
        let entries: Vec<SelectionEntry> = args
            .entities
            .iter()
            .map(SelectionEntry::selected)
            .collect();
        settings.set(SENSORS_LIST, serde_json::to_string(&entries)?);
    }

    let directory = super::directory_for(&settings, &cfg)?;
    let sensors = directory
        .enabled_sensors(&CancellationToken::new())
        .await?;

    let out = output::render_list::<_, SensorRow<'_>>(global.output, &sensors)?;
    output::print_output(&out);
    Ok(())
}
