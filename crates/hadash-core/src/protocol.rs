// ── Device protocol ──
//
// Wire types exchanged with the watch. Inbound `request` payloads are
// JSON bytes; each one is answered exactly once through its
// `RequestContext`. Outbound `call` messages are unsolicited and
// unacknowledged.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};
use tokio::sync::oneshot;

use crate::error::CoreError;
use crate::model::{DisplaySensor, is_truthy};

/// Default service domain for `TOGGLE_SWITCH`.
pub const DEFAULT_SERVICE: &str = "switch";

/// Action name of the selection-changed notification.
pub const LIST_UPDATE: &str = "listUpdate";

/// Request methods understood by the companion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Method {
    ToggleSwitch,
    GetSensorsList,
}

/// Raw request body as sent by the watch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestPayload {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
}

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    ToggleSwitch {
        on: bool,
        service: String,
        entity_id: String,
    },
    GetSensorsList,
    Unsupported {
        method: String,
    },
}

impl DeviceCommand {
    /// Decode a request payload.
    ///
    /// Unknown methods decode to [`DeviceCommand::Unsupported`]; only
    /// malformed JSON or a toggle without a target is an error.
    pub fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        let raw: RequestPayload = serde_json::from_slice(payload)?;
        Self::from_payload(raw)
    }

    pub fn from_payload(raw: RequestPayload) -> Result<Self, CoreError> {
        let Ok(method) = raw.method.parse::<Method>() else {
            return Ok(Self::Unsupported { method: raw.method });
        };

        match method {
            Method::GetSensorsList => Ok(Self::GetSensorsList),
            Method::ToggleSwitch => {
                // No target means no service call: Home Assistant would accept
                // an empty body and act on nothing, so answer with an error.
                let entity_id = raw
                    .entity_id
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| CoreError::InvalidRequest {
                        message: format!("{method} requires entity_id"),
                    })?;
                let service = raw
                    .service
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| DEFAULT_SERVICE.to_owned());
                Ok(Self::ToggleSwitch {
                    on: is_truthy(&raw.value),
                    service,
                    entity_id,
                })
            }
        }
    }
}

// ── Responses ───────────────────────────────────────────────────────

/// `{ "data": { "result": ... } }` or `{ "data": { "error": "..." } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub data: ResponseData,
}

/// Untagged: `Error` is listed first so an `{error}` body never
/// deserializes as a `Result` with a null value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    Error { error: String },
    Result { result: Value },
}

impl DeviceResponse {
    /// `{data:{result:[]}}`, the acknowledgement for a toggle.
    pub fn ok() -> Self {
        Self::result(Value::Array(Vec::new()))
    }

    pub fn result(result: Value) -> Self {
        Self {
            data: ResponseData::Result { result },
        }
    }

    pub fn sensors(sensors: &[DisplaySensor]) -> Result<Self, CoreError> {
        Ok(Self::result(serde_json::to_value(sensors)?))
    }

    pub fn error(err: &CoreError) -> Self {
        Self {
            data: ResponseData::Error {
                error: err.to_string(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.data, ResponseData::Error { .. })
    }

    pub fn to_bytes(&self) -> Result<Bytes, CoreError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}

// ── Outbound calls ──────────────────────────────────────────────────

/// Unsolicited message pushed to the watch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCall {
    pub action: String,
    pub value: Value,
}

impl DeviceCall {
    pub fn list_update(sensors: &[DisplaySensor]) -> Result<Self, CoreError> {
        Ok(Self {
            action: LIST_UPDATE.to_owned(),
            value: serde_json::to_value(sensors)?,
        })
    }
}

// ── Request context ─────────────────────────────────────────────────

/// One inbound request and the slot its single response goes to.
#[derive(Debug)]
pub struct RequestContext {
    payload: Bytes,
    responder: oneshot::Sender<Bytes>,
}

impl RequestContext {
    pub fn new(payload: impl Into<Bytes>) -> (Self, oneshot::Receiver<Bytes>) {
        let (responder, rx) = oneshot::channel();
        let ctx = Self {
            payload: payload.into(),
            responder,
        };
        (ctx, rx)
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Deliver the response. Consumes the context, so a request cannot
    /// be answered twice.
    pub fn respond(self, response: &DeviceResponse) -> Result<(), CoreError> {
        let bytes = response.to_bytes()?;
        self.responder
            .send(bytes)
            .map_err(|_| CoreError::ChannelClosed)
    }
}
