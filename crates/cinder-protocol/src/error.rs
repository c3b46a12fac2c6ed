//! Error types for the protocol layer.

use crate::enums::{EMsg, EResult};

/// Errors raised while decoding or encoding frames and message bodies.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A protobuf body or header could not be decoded.
    #[error("protobuf decode failed: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A binary payload ended before a field could be read.
    #[error("payload truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// The message arrived protobuf-encoded when a legacy body was
    /// expected, or the other way round.
    #[error("unexpected encoding for {emsg}")]
    UnexpectedEncoding { emsg: EMsg },

    /// The frame is structurally wrong (bad header size, bad canary, ...).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A compressed multi-message could not be inflated.
    #[error("decompression failed: {0}")]
    Decompress(#[from] std::io::Error),
}

/// Errors a [`PacketHandler`](crate::PacketHandler) returns to the dispatcher.
///
/// The dispatcher uses [`HandlerError::is_fatal`] to decide whether the
/// connection has to be torn down or whether the offending message can
/// simply be dropped.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The server broke the protocol contract. The session can't continue.
    #[error("protocol violation: {0}")]
    ProtocolViolation(#[source] ProtocolError),

    /// One message could not be decoded. It is dropped and dispatch goes on.
    #[error("malformed {emsg}: {source}")]
    Malformed {
        emsg: EMsg,
        #[source]
        source: ProtocolError,
    },

    /// The server rejected the logon with a non-transient result.
    #[error("logon rejected: {0}")]
    LogOnRejected(EResult),
}

impl HandlerError {
    /// Whether the session must end because of this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Malformed { .. })
    }
}
