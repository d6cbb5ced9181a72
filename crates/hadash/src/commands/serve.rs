//! Serve command: the watch channel as line-delimited JSON on stdio.
//!
//! Input lines:
//!   `{"type":"request","id":1,"payload":{"method":"GET_SENSORS_LIST"}}`
//!   `{"type":"setting","key":"sensorsList","value":"[...]"}`
//! Output lines:
//!   `{"type":"response","id":1,"payload":{"data":{...}}}`
//!   `{"type":"call","payload":{"action":"listUpdate","value":[...]}}`
//!
//! Logs go to stderr; stdout carries protocol lines only.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use hadash_core::{Companion, DeviceCall, SettingsStore};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;

const OUTPUT_CHANNEL_SIZE: usize = 64;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Inbound {
    Request {
        #[serde(default)]
        id: Value,
        payload: Value,
    },
    Setting {
        key: String,
        #[serde(default)]
        value: Value,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Outbound {
    Response { id: Value, payload: Value },
    Call { payload: DeviceCall },
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::effective_config(global)?;
    let settings: Arc<dyn SettingsStore> = Arc::new(config::settings_for(&cfg, global)?);
    if !cfg.has_endpoint() {
        warn!("no Home Assistant address configured yet; waiting for settings");
    }

    let companion = Arc::new(Companion::start(Arc::clone(&settings), &cfg.transport())?);
    info!("serving on stdio");

    let (out_tx, out_rx) = mpsc::channel::<Outbound>(OUTPUT_CHANNEL_SIZE);
    let writer = tokio::spawn(write_lines(out_rx));
    let forwarder = tokio::spawn(forward_calls(Arc::clone(&companion), out_tx.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Inbound>(line) {
                    Ok(Inbound::Request { id, payload }) => {
                        let companion = Arc::clone(&companion);
                        let out = out_tx.clone();
                        in_flight.spawn(async move { answer(&companion, id, &payload, &out).await });
                    }
                    Ok(Inbound::Setting { key, value }) => apply_setting(settings.as_ref(), &key, value),
                    Err(e) => warn!(error = %e, "ignoring malformed input line"),
                }
            }
        }
    }

    while in_flight.join_next().await.is_some() {}
    companion.shutdown().await;

    // The forwarder ends once shutdown closes the call channel; the
    // writer ends when the last output sender is gone.
    let _ = forwarder.await;
    drop(out_tx);
    let _ = writer.await;
    debug!("serve finished");
    Ok(())
}

async fn answer(companion: &Companion, id: Value, payload: &Value, out: &mpsc::Sender<Outbound>) {
    let bytes = match serde_json::to_vec(payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "request payload not encodable");
            return;
        }
    };
    match companion.request(bytes).await {
        Ok(response) => {
            let payload = response_payload(&response);
            let _ = out.send(Outbound::Response { id, payload }).await;
        }
        Err(e) => warn!(error = %e, "request was not answered"),
    }
}

/// Response bytes as JSON, `null` if they do not decode.
fn response_payload(response: &[u8]) -> Value {
    serde_json::from_slice(response).unwrap_or_else(|e| {
        warn!(error = %e, "response payload is not JSON, answering null");
        Value::Null
    })
}

/// String values are stored as-is, `null` removes the key, anything
/// else is stored as its JSON text.
fn apply_setting(settings: &dyn SettingsStore, key: &str, value: Value) {
    debug!(key, "setting changed");
    match value {
        Value::Null => settings.remove(key),
        Value::String(s) => settings.set(key, s),
        other => settings.set(key, other.to_string()),
    }
}

async fn forward_calls(companion: Arc<Companion>, out: mpsc::Sender<Outbound>) {
    while let Some(call) = companion.next_call().await {
        if out.send(Outbound::Call { payload: call }).await.is_err() {
            break;
        }
    }
}

async fn write_lines(mut rx: mpsc::Receiver<Outbound>) {
    let mut stdout = tokio::io::stdout();
    while let Some(message) = rx.recv().await {
        let mut line = match serde_json::to_vec(&message) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "output line not encodable");
                continue;
            }
        };
        line.push(b'\n');
        if stdout.write_all(&line).await.is_err() || stdout.flush().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hadash_core::MemorySettings;
    use hadash_core::settings::SENSORS_LIST;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_request_and_setting_lines() {
        let req: Inbound =
            serde_json::from_str(r#"{"type":"request","id":7,"payload":{"method":"GET_SENSORS_LIST"}}"#)
                .unwrap();
        assert!(matches!(req, Inbound::Request { ref id, .. } if *id == json!(7)));

        let set: Inbound =
            serde_json::from_str(r#"{"type":"setting","key":"listFetchRandom","value":"0.5"}"#)
                .unwrap();
        assert!(matches!(set, Inbound::Setting { ref key, .. } if key == "listFetchRandom"));
    }

    #[test]
    fn outbound_lines_are_tagged() {
        let line = serde_json::to_value(Outbound::Response {
            id: json!(1),
            payload: json!({ "data": { "result": [] } }),
        })
        .unwrap();
        assert_eq!(
            line,
            json!({ "type": "response", "id": 1, "payload": { "data": { "result": [] } } })
        );
    }

    #[test]
    fn undecodable_response_becomes_null_payload() {
        assert_eq!(response_payload(b"\xff not json"), Value::Null);
        assert_eq!(
            response_payload(br#"{"data":{"result":[]}}"#),
            json!({ "data": { "result": [] } })
        );
    }

    #[test]
    fn structured_setting_values_are_stored_as_json_text() {
        let settings = MemorySettings::new();
        apply_setting(&settings, SENSORS_LIST, json!([{ "key": "switch.fan", "value": true }]));
        assert_eq!(
            settings.get(SENSORS_LIST).as_deref(),
            Some(r#"[{"key":"switch.fan","value":true}]"#)
        );

        apply_setting(&settings, SENSORS_LIST, Value::Null);
        assert_eq!(settings.get(SENSORS_LIST), None);
    }
}
