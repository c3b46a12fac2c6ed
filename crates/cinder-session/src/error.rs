//! Error types for the session layer.

use crate::SessionState;

/// Errors returned by the logon API.
///
/// Failures reported by the server arrive asynchronously as events, not
/// through this type.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Bad caller input, rejected before anything is sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The operation isn't allowed in the current session state.
    #[error("not allowed while {0:?}")]
    InvalidState(SessionState),
}
