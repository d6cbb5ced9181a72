// ── Settings change reactor ──
//
// Two keys matter: a `sensorsList` change pushes the recomputed sensor
// list to the watch, a `listFetchRandom` change rebuilds the entity
// catalog into `sensorsList`. Changes are handled one at a time, in the
// order the store emitted them.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::directory::SensorDirectory;
use crate::error::CoreError;
use crate::protocol::DeviceCall;
use crate::settings::{LIST_FETCH_RANDOM, SENSORS_LIST, SettingsChange, SettingsStore};

pub struct ChangeReactor {
    directory: SensorDirectory,
    settings: Arc<dyn SettingsStore>,
    calls: mpsc::Sender<DeviceCall>,
}

impl ChangeReactor {
    pub fn new(
        directory: SensorDirectory,
        settings: Arc<dyn SettingsStore>,
        calls: mpsc::Sender<DeviceCall>,
    ) -> Self {
        Self {
            directory,
            settings,
            calls,
        }
    }

    /// Consume change notifications until the store goes away or `cancel` fires.
    pub async fn run(self, mut changes: broadcast::Receiver<SettingsChange>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                change = changes.recv() => match change {
                    Ok(change) => self.handle_logged(&change, &cancel).await,
                    Err(RecvError::Lagged(skipped)) => {
                        // A missed selection change would leave the watch stale.
                        warn!(skipped, "settings changes dropped, resending sensor list");
                        if let Err(e) = self.push_list_update(&cancel).await {
                            warn!(error = %e, "list update after lag failed");
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        debug!("change reactor stopped");
    }

    async fn handle_logged(&self, change: &SettingsChange, cancel: &CancellationToken) {
        match self.handle(change, cancel).await {
            Ok(()) => {}
            Err(CoreError::Cancelled) => debug!(key = %change.key, "change handling cancelled"),
            Err(e) => warn!(key = %change.key, error = %e, "settings change handling failed"),
        }
    }

    /// React to one change. Keys other than the two watched ones are ignored.
    pub async fn handle(
        &self,
        change: &SettingsChange,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        match change.key.as_str() {
            SENSORS_LIST => self.push_list_update(cancel).await,
            LIST_FETCH_RANDOM => self.refresh_catalog(cancel).await,
            _ => Ok(()),
        }
    }

    /// Queue a `listUpdate` without waiting on the host.
    ///
    /// A full outbound queue drops the update; a later change sends a
    /// fresh list anyway.
    async fn push_list_update(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        let sensors = self.directory.enabled_sensors(cancel).await?;
        let call = DeviceCall::list_update(&sensors)?;
        match self.calls.try_send(call) {
            Ok(()) => debug!(count = sensors.len(), "pushed list update"),
            Err(TrySendError::Full(_)) => {
                warn!(count = sensors.len(), "outbound call queue full, list update dropped");
            }
            Err(TrySendError::Closed(_)) => return Err(CoreError::ChannelClosed),
        }
        Ok(())
    }

    /// Overwrite `sensorsList` with the full catalog.
    ///
    /// The write itself is a `sensorsList` change, so a list update
    /// follows once this reactor sees it.
    async fn refresh_catalog(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        let catalog = self.directory.catalog(cancel).await?;
        let text = serde_json::to_string(&catalog)?;
        self.settings.set(SENSORS_LIST, text);
        info!(entities = catalog.len(), "entity catalog refreshed");
        Ok(())
    }
}
