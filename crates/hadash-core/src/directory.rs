// ── Sensor directory ──
//
// Read side of the companion: backend states joined with the stored
// selection. Recomputed on every call; nothing is cached.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use hadash_api::FailoverClient;

use crate::error::CoreError;
use crate::model::{self, CatalogEntry, DisplaySensor, SelectionEntry};
use crate::settings::{SENSORS_LIST, SettingsStore};

#[derive(Clone)]
pub struct SensorDirectory {
    client: FailoverClient,
    settings: Arc<dyn SettingsStore>,
}

impl SensorDirectory {
    pub fn new(client: FailoverClient, settings: Arc<dyn SettingsStore>) -> Self {
        Self { client, settings }
    }

    pub fn client(&self) -> &FailoverClient {
        &self.client
    }

    /// Current selection snapshot from the settings store.
    pub fn selection(&self) -> Result<Vec<SelectionEntry>, CoreError> {
        model::parse_selection(self.settings.get(SENSORS_LIST).as_deref())
    }

    /// Selected sensors that the backend currently reports, in selection order.
    ///
    /// The backend is queried before the selection is read, so the returned
    /// list reflects the selection as of the moment the states arrived.
    pub async fn enabled_sensors(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<DisplaySensor>, CoreError> {
        let states = self.client.states(cancel).await?;
        let selection = self.selection()?;
        let sensors = model::select_sensors(&states, &selection);
        debug!(
            selected = selection.len(),
            shown = sensors.len(),
            "resolved enabled sensors"
        );
        Ok(sensors)
    }

    /// Every entity the backend knows, as `{key, title}` pairs.
    pub async fn catalog(&self, cancel: &CancellationToken) -> Result<Vec<CatalogEntry>, CoreError> {
        let states = self.client.states(cancel).await?;
        Ok(model::build_catalog(&states))
    }
}
