//! Catalog command handler.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use hadash_core::SettingsStore;

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output::{self, CatalogRow};

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::config_with_endpoint(global)?;
    let settings: Arc<dyn SettingsStore> = Arc::new(config::settings_for(&cfg, global)?);

    let directory = super::directory_for(&settings, &cfg)?;
    let catalog = directory.catalog(&CancellationToken::new()).await?;

    let out = output::render_list::<_, CatalogRow<'_>>(global.output, &catalog)?;
    output::print_output(&out);
    Ok(())
}
