// ── Settings store ──
//
// The companion's only shared mutable state. The host owns the store;
// core reads it synchronously, writes the entity catalog back into it,
// and reacts to its change notifications. Last writer wins.

use std::sync::Arc;

use dashmap::DashMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use hadash_api::{EndpointResolver, Endpoints, TokenSource};

/// Bearer token for the Home Assistant API.
pub const HA_TOKEN: &str = "HAToken";
/// LAN base address, e.g. `http://192.168.1.2:8123`.
pub const LOCAL_HA_IP: &str = "localHAIP";
/// Remote base address, e.g. `https://ha.example.com`.
pub const EXTERNAL_HA_IP: &str = "externalHAIP";
/// JSON text of `[{key, value}]` selection entries; also receives the catalog.
pub const SENSORS_LIST: &str = "sensorsList";
/// Written with a fresh value to request a catalog refresh.
pub const LIST_FETCH_RANDOM: &str = "listFetchRandom";

const CHANGE_CHANNEL_SIZE: usize = 64;

/// A single key change, as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsChange {
    pub key: String,
    pub new_value: Option<String>,
    pub old_value: Option<String>,
}

/// Key-value settings with change notification.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key` and notify subscribers.
    fn set(&self, key: &str, value: String);

    /// Remove `key` and notify subscribers if it was present.
    fn remove(&self, key: &str);

    fn subscribe(&self) -> broadcast::Receiver<SettingsChange>;
}

/// In-memory settings store.
///
/// Every `set` notifies, even when the value is unchanged, so a trigger
/// key can be re-fired by writing it again.
pub struct MemorySettings {
    values: DashMap<String, String>,
    changes: broadcast::Sender<SettingsChange>,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySettings {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_SIZE);
        Self {
            values: DashMap::new(),
            changes,
        }
    }

    /// Build a store pre-populated with `entries`, without notifying.
    pub fn with_values<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        for (key, value) in entries {
            store.values.insert(key.into(), value.into());
        }
        store
    }

    fn notify(&self, key: &str, new_value: Option<String>, old_value: Option<String>) {
        // No subscribers is fine.
        let _ = self.changes.send(SettingsChange {
            key: key.to_owned(),
            new_value,
            old_value,
        });
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        let old = self.values.insert(key.to_owned(), value.clone());
        self.notify(key, Some(value), old);
    }

    fn remove(&self, key: &str) {
        if let Some((_, old)) = self.values.remove(key) {
            self.notify(key, None, Some(old));
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SettingsChange> {
        self.changes.subscribe()
    }
}

/// Endpoint and token source backed by a settings store.
///
/// Re-reads the store on every call, so the failover client always
/// sees the latest addresses and token.
#[derive(Clone)]
pub struct SettingsSource {
    settings: Arc<dyn SettingsStore>,
}

impl SettingsSource {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }
}

impl EndpointResolver for SettingsSource {
    fn endpoints(&self) -> Endpoints {
        Endpoints::new(
            self.settings.get(LOCAL_HA_IP),
            self.settings.get(EXTERNAL_HA_IP),
        )
    }
}

impl TokenSource for SettingsSource {
    fn token(&self) -> Option<SecretString> {
        self.settings.get(HA_TOKEN).map(SecretString::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn set_notifies_with_old_and_new_values() {
        let store = MemorySettings::with_values([(SENSORS_LIST, "[]")]);
        let mut rx = store.subscribe();

        store.set(SENSORS_LIST, r#"[{"key":"light.kitchen","value":true}]"#.into());

        let change = rx.try_recv().unwrap();
        assert_eq!(change.key, SENSORS_LIST);
        assert_eq!(change.old_value.as_deref(), Some("[]"));
        assert_eq!(
            change.new_value.as_deref(),
            Some(r#"[{"key":"light.kitchen","value":true}]"#)
        );
    }

    #[test]
    fn setting_the_same_value_notifies_again() {
        let store = MemorySettings::new();
        let mut rx = store.subscribe();

        store.set(LIST_FETCH_RANDOM, "1".into());
        store.set(LIST_FETCH_RANDOM, "1".into());

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn remove_missing_key_is_silent() {
        let store = MemorySettings::new();
        let mut rx = store.subscribe();

        store.remove(HA_TOKEN);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn source_reads_current_settings() {
        let store: Arc<dyn SettingsStore> = Arc::new(MemorySettings::with_values([
            (HA_TOKEN, "abc"),
            (EXTERNAL_HA_IP, "https://ha.example.com"),
        ]));
        let source = SettingsSource::new(Arc::clone(&store));

        assert_eq!(source.endpoints(), Endpoints::external("https://ha.example.com"));
        assert_eq!(source.token().unwrap().expose_secret(), "abc");

        store.set(LOCAL_HA_IP, "http://192.168.1.2:8123".into());
        assert_eq!(
            source.endpoints().local.as_deref(),
            Some("http://192.168.1.2:8123")
        );
    }
}
