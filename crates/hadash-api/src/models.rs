use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entity as returned by `GET /api/states`.
///
/// Only the fields the companion reads are typed; the timestamps and
/// context Home Assistant also sends are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
}

impl EntityState {
    fn string_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.as_ref()?.get(name)?.as_str()
    }

    /// `attributes.friendly_name`, when it is a string.
    pub fn friendly_name(&self) -> Option<&str> {
        self.string_attribute("friendly_name")
    }

    /// `attributes.unit_of_measurement`, when it is a string.
    pub fn unit_of_measurement(&self) -> Option<&str> {
        self.string_attribute("unit_of_measurement")
    }

    /// Entity domain: the id up to the first `.` (the whole id if there is none).
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map_or(self.entity_id.as_str(), |(domain, _)| domain)
    }
}

/// Body of `GET /api/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiMessage {
    pub message: String,
}

/// Body of `POST /api/services/{domain}/{service}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceTarget<'a> {
    pub entity_id: &'a str,
}
