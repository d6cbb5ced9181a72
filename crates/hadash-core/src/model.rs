// ── Display model ──
//
// Selection entries come from the settings store, entity states from the
// backend. Everything here is pure: no I/O, no shared state.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use hadash_api::EntityState;

use crate::error::CoreError;

/// One entry of the user's `sensorsList` selection.
///
/// The catalog written by a refresh has the same shape without `value`,
/// so a missing flag reads as "not selected".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub key: String,
    #[serde(default, deserialize_with = "truthy")]
    pub value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SelectionEntry {
    pub fn selected(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: true,
            title: None,
        }
    }
}

/// A sensor ready for the watch face.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySensor {
    pub key: String,
    pub title: String,
    pub state: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<&EntityState> for DisplaySensor {
    fn from(entity: &EntityState) -> Self {
        let mut state = entity.state.clone();
        if let Some(unit) = entity.unit_of_measurement() {
            state.push_str(unit);
        }
        Self {
            key: entity.entity_id.clone(),
            title: display_title(entity).to_owned(),
            state,
            kind: entity.domain().to_owned(),
        }
    }
}

/// One entry of the full entity catalog offered for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub key: String,
    pub title: String,
}

impl From<&EntityState> for CatalogEntry {
    fn from(entity: &EntityState) -> Self {
        Self {
            key: entity.entity_id.clone(),
            title: display_title(entity).to_owned(),
        }
    }
}

fn display_title(entity: &EntityState) -> &str {
    entity.friendly_name().unwrap_or(&entity.entity_id)
}

/// Parse the stored `sensorsList` text. An absent key is an empty selection.
pub fn parse_selection(raw: Option<&str>) -> Result<Vec<SelectionEntry>, CoreError> {
    match raw {
        None => Ok(Vec::new()),
        Some(text) => Ok(serde_json::from_str(text)?),
    }
}

/// Resolve the selected entries against the backend states.
///
/// Output follows selection order. Entries with a false flag, or whose key
/// has no matching entity, are left out.
pub fn select_sensors(states: &[EntityState], selection: &[SelectionEntry]) -> Vec<DisplaySensor> {
    selection
        .iter()
        .filter(|entry| entry.value)
        .filter_map(|entry| {
            let found = states.iter().find(|s| s.entity_id == entry.key);
            if found.is_none() {
                tracing::debug!(key = %entry.key, "selected entity not reported by backend");
            }
            found
        })
        .map(DisplaySensor::from)
        .collect()
}

/// Map every entity state to a catalog entry, in backend order.
pub fn build_catalog(states: &[EntityState]) -> Vec<CatalogEntry> {
    states.iter().map(CatalogEntry::from).collect()
}

/// JavaScript-style truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(is_truthy(&value))
}
