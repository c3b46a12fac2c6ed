//! Client configuration, loaded from JSON.
//!
//! ```json
//! {
//!   "server_url": "wss://cm.example.net:443/cmsocket/",
//!   "client_language": "english",
//!   "heartbeat": { "interval_ms": 9000 }
//! }
//! ```
//!
//! Every field is optional; missing ones take their defaults.

use std::path::Path;

use cinder_protocol::EventBus;
use cinder_session::AuthConfig;
use serde::{Deserialize, Serialize};

use crate::ClientError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the connection manager.
    pub server_url: String,
    /// Logon language, protocol version and fallback heartbeat.
    #[serde(flatten)]
    pub auth: AuthConfig,
    /// Events a slow subscriber may fall behind before it starts lagging.
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:27020/cmsocket/".to_owned(),
            auth: AuthConfig::default(),
            event_capacity: EventBus::DEFAULT_CAPACITY,
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ClientError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
