// ── Companion facade ──
//
// Owns the background tasks: the command router on the request channel
// and the change reactor on the settings subscription. The host feeds
// requests in and drains outbound calls.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use hadash_api::{FailoverClient, TransportConfig};

use crate::directory::SensorDirectory;
use crate::error::CoreError;
use crate::protocol::{DeviceCall, DeviceResponse, RequestContext};
use crate::reactor::ChangeReactor;
use crate::router::CommandRouter;
use crate::settings::{SettingsSource, SettingsStore};

const REQUEST_CHANNEL_SIZE: usize = 32;
const CALL_CHANNEL_SIZE: usize = 32;

/// Running companion service.
///
/// Dropping it without [`shutdown()`](Self::shutdown) leaves the tasks
/// running until the runtime stops.
pub struct Companion {
    settings: Arc<dyn SettingsStore>,
    directory: SensorDirectory,
    requests: mpsc::Sender<RequestContext>,
    calls: Mutex<mpsc::Receiver<DeviceCall>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Companion {
    /// Build the HTTP client from `transport` and start serving.
    ///
    /// Endpoints and token are read from `settings` on every request.
    pub fn start(
        settings: Arc<dyn SettingsStore>,
        transport: &TransportConfig,
    ) -> Result<Self, CoreError> {
        let source = Arc::new(SettingsSource::new(Arc::clone(&settings)));
        let client = FailoverClient::new(Arc::clone(&source) as _, source, transport)?;
        Ok(Self::with_client(settings, client))
    }

    /// Start serving with a prepared client.
    ///
    /// Must be called inside a tokio runtime.
    pub fn with_client(settings: Arc<dyn SettingsStore>, client: FailoverClient) -> Self {
        let directory = SensorDirectory::new(client, Arc::clone(&settings));
        let (requests, inbound) = mpsc::channel(REQUEST_CHANNEL_SIZE);
        let (calls_tx, calls) = mpsc::channel(CALL_CHANNEL_SIZE);
        let cancel = CancellationToken::new();

        // Subscribe before spawning so no change between here and the
        // reactor's first poll is missed.
        let changes = settings.subscribe();

        let router = CommandRouter::new(directory.clone());
        let reactor = ChangeReactor::new(directory.clone(), Arc::clone(&settings), calls_tx);

        let handles = vec![
            tokio::spawn(router.run(inbound, cancel.child_token())),
            tokio::spawn(reactor.run(changes, cancel.child_token())),
        ];

        Self {
            settings,
            directory,
            requests,
            calls: Mutex::new(calls),
            cancel,
            task_handles: Mutex::new(handles),
        }
    }

    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.settings
    }

    pub fn directory(&self) -> &SensorDirectory {
        &self.directory
    }

    /// Submit a raw request payload and wait for its response bytes.
    pub async fn request(&self, payload: impl Into<Bytes>) -> Result<Bytes, CoreError> {
        let (ctx, rx) = RequestContext::new(payload);
        self.requests
            .send(ctx)
            .await
            .map_err(|_| CoreError::ChannelClosed)?;
        rx.await.map_err(|_| CoreError::ChannelClosed)
    }

    /// Submit a request value and decode the response.
    pub async fn request_json(&self, payload: &impl Serialize) -> Result<DeviceResponse, CoreError> {
        let bytes = self.request(serde_json::to_vec(payload)?).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Next outbound call. `None` once the companion has shut down.
    pub async fn next_call(&self) -> Option<DeviceCall> {
        self.calls.lock().await.recv().await
    }

    /// Every outbound call that arrives within `window`.
    pub async fn take_calls(&self, window: Duration) -> Vec<DeviceCall> {
        let mut calls = self.calls.lock().await;
        let mut out = Vec::new();
        let deadline = tokio::time::Instant::now() + window;
        while let Ok(Some(call)) = tokio::time::timeout_at(deadline, calls.recv()).await {
            out.push(call);
        }
        out
    }

    /// Cancel the background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let mut handles = self.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("companion stopped");
    }
}
