// hadash-api: Async Home Assistant REST client with local/external failover

pub mod client;
pub mod endpoint;
pub mod error;
pub mod hass;
pub mod models;
pub mod response;
pub mod transport;

pub use client::{FailoverClient, RequestOptions};
pub use endpoint::{EndpointKind, EndpointResolver, Endpoints, TokenSource};
pub use error::{EndpointFailure, Error, FailoverError};
pub use hass::{STATES_PATH, STATUS_PATH, service_path};
pub use models::{ApiMessage, EntityState, ServiceTarget};
pub use response::{ApiResponse, ResponseBody};
pub use transport::{TlsMode, TransportConfig};
