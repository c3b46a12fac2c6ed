//! Error types for the social layer.

use cinder_protocol::SteamId;

/// Errors returned by the social API.
#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    /// Messages can only go to individuals, clans and chat rooms.
    #[error("cannot send a message to {0}: unsupported account type")]
    UnsupportedRecipient(SteamId),

    /// Bad caller input, rejected before anything is sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}
