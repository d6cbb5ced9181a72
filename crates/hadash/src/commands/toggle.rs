//! Toggle command handler. Goes through the same router the watch uses.

use std::sync::Arc;

use serde_json::json;

use hadash_core::{Companion, ResponseData};

use crate::cli::{GlobalOpts, ToggleArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: ToggleArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::config_with_endpoint(global)?;
    let settings = Arc::new(config::settings_for(&cfg, global)?);
    let companion = Companion::start(settings, &cfg.transport())?;

    let request = json!({
        "method": "TOGGLE_SWITCH",
        "value": args.on,
        "service": args.service,
        "entity_id": args.entity_id,
    });
    let response = companion.request_json(&request).await;
    companion.shutdown().await;
    let response = response?;

    if let ResponseData::Error { ref error } = response.data {
        return Err(CliError::RequestFailed {
            message: error.clone(),
        });
    }

    let state = if args.on { "on" } else { "off" };
    let out = output::render_single(global.output, &response, |_| {
        format!("{} turned {state}", args.entity_id)
    })?;
    output::print_output(&out);
    Ok(())
}
