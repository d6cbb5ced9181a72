// ── Command router ──
//
// Serves the watch's request channel. Each request runs in its own task
// so a slow backend call does not hold up the next request; every
// request gets exactly one response, errors included.

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::directory::SensorDirectory;
use crate::error::CoreError;
use crate::protocol::{DeviceCommand, DeviceResponse, RequestContext};

#[derive(Clone)]
pub struct CommandRouter {
    directory: SensorDirectory,
}

impl CommandRouter {
    pub fn new(directory: SensorDirectory) -> Self {
        Self { directory }
    }

    /// Serve `inbound` until it closes or `cancel` fires.
    ///
    /// In-flight requests are drained before returning; on cancellation
    /// they observe the cancelled token and answer with an error.
    pub async fn run(self, mut inbound: mpsc::Receiver<RequestContext>, cancel: CancellationToken) {
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "request task failed");
                    }
                }
                ctx = inbound.recv() => {
                    let Some(ctx) = ctx else { break };
                    let router = self.clone();
                    let token = cancel.child_token();
                    in_flight.spawn(async move { router.handle(ctx, &token).await });
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "request task failed");
            }
        }
        debug!("command router stopped");
    }

    /// Answer one request.
    pub async fn handle(&self, ctx: RequestContext, cancel: &CancellationToken) {
        let response = self.dispatch(ctx.payload(), cancel).await;
        if let Err(e) = ctx.respond(&response) {
            debug!(error = %e, "requester went away before the response");
        }
    }

    /// Decode and execute a request payload. Never fails: errors are
    /// folded into an in-band `{data:{error}}` response.
    pub async fn dispatch(&self, payload: &[u8], cancel: &CancellationToken) -> DeviceResponse {
        let outcome = match DeviceCommand::decode(payload) {
            Ok(command) => self.execute(command, cancel).await,
            Err(e) => Err(e),
        };

        outcome.unwrap_or_else(|e| {
            warn!(error = %e, "device request failed");
            DeviceResponse::error(&e)
        })
    }

    async fn execute(
        &self,
        command: DeviceCommand,
        cancel: &CancellationToken,
    ) -> Result<DeviceResponse, CoreError> {
        match command {
            DeviceCommand::ToggleSwitch {
                on,
                service,
                entity_id,
            } => {
                let action = if on { "turn_on" } else { "turn_off" };
                let resp = self
                    .directory
                    .client()
                    .call_service(&service, action, &entity_id, cancel)
                    .await?;
                if !resp.is_success() {
                    warn!(status = %resp.status, %entity_id, "{service}.{action} was not accepted");
                }
                Ok(DeviceResponse::ok())
            }
            DeviceCommand::GetSensorsList => {
                let sensors = self.directory.enabled_sensors(cancel).await?;
                DeviceResponse::sensors(&sensors)
            }
            DeviceCommand::Unsupported { method } => Err(CoreError::UnsupportedMethod { method }),
        }
    }
}
