//! Check command handler: probe `GET /api/` through the failover client.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use hadash_api::{ApiMessage, EndpointKind, EndpointResolver, RequestOptions, STATUS_PATH};
use hadash_core::{SettingsSource, SettingsStore};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct CheckReport {
    endpoint: String,
    url: String,
    message: String,
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::config_with_endpoint(global)?;
    let settings: Arc<dyn SettingsStore> = Arc::new(config::settings_for(&cfg, global)?);
    let client = super::client_for(&settings, &cfg)?;

    let resp = client
        .request(STATUS_PATH, &RequestOptions::get(), &CancellationToken::new())
        .await?;
    if resp.status.as_u16() == 401 {
        return Err(CliError::AuthFailed);
    }
    let msg: ApiMessage = resp.json()?;

    let endpoints = SettingsSource::new(settings).endpoints();
    let url = match resp.endpoint {
        EndpointKind::Local => endpoints.local,
        EndpointKind::External => endpoints.external,
    }
    .unwrap_or_default();

    let report = CheckReport {
        endpoint: resp.endpoint.to_string(),
        url,
        message: msg.message,
    };
    let out = output::render_single(global.output, &report, |r| {
        format!("{} ({} address {})", r.message, r.endpoint, r.url)
    })?;
    output::print_output(&out);
    Ok(())
}
