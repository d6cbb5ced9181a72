//! Companion logic between a wearable dashboard and Home Assistant.
//!
//! - **[`Companion`]**: Facade that owns the background tasks:
//!   [`start()`](Companion::start) spawns the command router and the
//!   settings reactor, [`shutdown()`](Companion::shutdown) cancels and joins them.
//!
//! - **[`SensorDirectory`]**: Joins backend entity states with the user's
//!   `sensorsList` selection into display-ready [`DisplaySensor`]s.
//!
//! - **[`CommandRouter`]**: Answers `TOGGLE_SWITCH` and `GET_SENSORS_LIST`
//!   requests from the watch. Every request gets exactly one response.
//!
//! - **[`ChangeReactor`]**: Pushes `listUpdate` calls when the selection
//!   changes and rebuilds the entity catalog on `listFetchRandom`.
//!
//! - **[`SettingsStore`]**: Injected key-value store with change
//!   notification. [`MemorySettings`] is the in-process implementation.

pub mod companion;
pub mod directory;
pub mod error;
pub mod model;
pub mod protocol;
pub mod reactor;
pub mod router;
pub mod settings;

// ── Primary re-exports ──────────────────────────────────────────────
pub use companion::Companion;
pub use directory::SensorDirectory;
pub use error::CoreError;
pub use model::{CatalogEntry, DisplaySensor, SelectionEntry};
pub use protocol::{DeviceCall, DeviceCommand, DeviceResponse, Method, RequestContext, ResponseData};
pub use reactor::ChangeReactor;
pub use router::CommandRouter;
pub use settings::{MemorySettings, SettingsChange, SettingsSource, SettingsStore};
