//! Session management for Cinder.
//!
//! - [`Session`]: the client's identity and logon phase, readable from any
//!   task.
//! - [`Auth`]: logon API and handler for authentication messages; the only
//!   writer of the session.
//! - [`LogOnDetails`]: credentials for one attempt.

mod auth;
mod details;
mod error;
mod session;

pub use auth::{Auth, AuthConfig};
pub use details::LogOnDetails;
pub use error::SessionError;
pub use session::{Session, SessionState};
