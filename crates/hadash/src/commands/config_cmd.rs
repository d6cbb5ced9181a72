//! Config command handlers. No Home Assistant connection needed.

use serde_json::json;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path(global).display().to_string());
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::effective_config(global)?;
            let token_source = if global.token.is_some() {
                "flag"
            } else if hadash_config::resolve_token(&cfg).is_some() {
                "configured"
            } else {
                "none"
            };
            let view = json!({
                "path": config::config_path(global),
                "local_url": cfg.local_url,
                "external_url": cfg.external_url,
                "token": token_source,
                "token_env": cfg.token_env,
                "timeout": cfg.timeout,
                "insecure": cfg.insecure,
                "ca_cert": cfg.ca_cert,
                "sensors": cfg.sensors,
            });
            let out = output::render_single(global.output, &view, |v| {
                let mut lines = Vec::new();
                if let Some(map) = v.as_object() {
                    for (key, value) in map {
                        let shown = match value {
                            serde_json::Value::Null => "-".to_owned(),
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        lines.push(format!("{key:<13}{shown}"));
                    }
                }
                lines.join("\n")
            })?;
            output::print_output(&out);
            Ok(())
        }

        ConfigCommand::Save(save) => {
            let mut cfg = config::effective_config(global)?;
            if save.token_env.is_some() {
                cfg.token_env = save.token_env;
            }
            if !save.sensors.is_empty() {
                cfg.sensors = save.sensors;
            }
            let path = hadash_config::save_config(&cfg, global.config.as_deref())?;
            eprintln!("Config written to {}", path.display());
            Ok(())
        }
    }
}
