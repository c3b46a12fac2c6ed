//! Unified error type for the Cinder client.

use cinder_protocol::{HandlerError, ProtocolError};
use cinder_session::SessionError;
use cinder_social::SocialError;
use cinder_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (bad credentials, wrong phase).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A social API error (bad recipient, bad argument).
    #[error(transparent)]
    Social(#[from] SocialError),

    /// A handler rejected an inbound message and the connection was closed.
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// The configuration is not valid JSON for [`ClientConfig`](crate::ClientConfig).
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    /// `run` was called while another connection is being served.
    #[error("client is already running a connection")]
    AlreadyRunning,
}
