//! # Cinder
//!
//! Async client for a Steam-style connection manager.
//!
//! Cinder logs an account on, keeps the session alive with heartbeats and
//! mirrors the account's social graph (friends, groups and group chat
//! members) in a cache that is safe to read from any task.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cinder::prelude::*;
//!
//! # async fn demo() -> Result<(), ClientError> {
//! let config = ClientConfig::from_json_file("cinder.json")?;
//! let conn = WebSocketConnection::connect(&config.server_url).await?;
//! let client = Client::builder().config(config).build();
//! client.log_on(&LogOnDetails::new("user", "pass"))?;
//! client.run(conn).await
//! # }
//! ```

mod client;
mod config;
mod dispatch;
mod error;
mod logging;

pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use dispatch::Dispatcher;
pub use error::ClientError;
pub use logging::init_tracing;

pub mod prelude {
    pub use crate::{init_tracing, Client, ClientBuilder, ClientConfig, ClientError, Dispatcher};
    pub use cinder_heartbeat::HeartbeatConfig;
    pub use cinder_protocol::{
        ChatEntryType, EMsg, EResult, Event, EventReceiver, FrameCodec, PacketHandler, PacketMsg,
        PersonaState, SteamCodec, SteamId,
    };
    pub use cinder_session::{AuthConfig, LogOnDetails, Session, SessionError, SessionState};
    pub use cinder_social::{ChatMember, Friend, Group, Social, SocialError};
    pub use cinder_transport::{Connection, ConnectionId, TransportError, WebSocketConnection};
}
