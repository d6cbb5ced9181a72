// Home Assistant REST endpoints
//
// Typed calls on top of `FailoverClient::request`.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{FailoverClient, RequestOptions};
use crate::endpoint::EndpointKind;
use crate::error::Error;
use crate::models::{ApiMessage, EntityState, ServiceTarget};
use crate::response::ApiResponse;

/// All entity states.
pub const STATES_PATH: &str = "/api/states";

/// API liveness probe.
pub const STATUS_PATH: &str = "/api/";

/// `/api/services/{domain}/{service}`
pub fn service_path(domain: &str, service: &str) -> String {
    format!("/api/services/{domain}/{service}")
}

impl FailoverClient {
    /// Fetch every entity state.
    pub async fn states(&self, cancel: &CancellationToken) -> Result<Vec<EntityState>, Error> {
        let resp = self
            .request(STATES_PATH, &RequestOptions::get(), cancel)
            .await?;
        let states: Vec<EntityState> = resp.json()?;
        debug!(count = states.len(), endpoint = %resp.endpoint, "fetched entity states");
        Ok(states)
    }

    /// Call a service against one entity. The response body is not interpreted.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        entity_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, Error> {
        let options = RequestOptions::post_json(&ServiceTarget { entity_id })?;
        let resp = self
            .request(&service_path(domain, service), &options, cancel)
            .await?;
        debug!(status = %resp.status, "{domain}.{service} on {entity_id}");
        Ok(resp)
    }

    /// Probe `GET /api/` and report which endpoint answered.
    pub async fn ping(&self, cancel: &CancellationToken) -> Result<(EndpointKind, String), Error> {
        let resp = self
            .request(STATUS_PATH, &RequestOptions::get(), cancel)
            .await?;
        let msg: ApiMessage = resp.json()?;
        Ok((resp.endpoint, msg.message))
    }
}
