//! Credentials for one logon attempt.

use crate::SessionError;

/// What [`Auth::log_on`](crate::Auth::log_on) sends to the server.
///
/// `auth_code` is the code mailed to the account owner, `two_factor_code`
/// the one from an authenticator app. `sentry_hash` is the machine-auth
/// hash saved from an earlier [`MachineAuthUpdated`] event; leave it unset
/// on a first logon from this machine.
///
/// [`MachineAuthUpdated`]: cinder_protocol::Event::MachineAuthUpdated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOnDetails {
    pub username: String,
    pub password: String,
    pub auth_code: Option<String>,
    pub two_factor_code: Option<String>,
    pub sentry_hash: Option<Vec<u8>>,
    /// Ask the server for a login key after logon.
    pub should_remember_password: bool,
}

impl LogOnDetails {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_auth_code(mut self, code: impl Into<String>) -> Self {
        self.auth_code = Some(code.into());
        self
    }

    pub fn with_two_factor_code(mut self, code: impl Into<String>) -> Self {
        self.two_factor_code = Some(code.into());
        self
    }

    pub fn with_sentry_hash(mut self, hash: impl Into<Vec<u8>>) -> Self {
        self.sentry_hash = Some(hash.into());
        self
    }

    /// Checks the invariants that must hold before anything is sent.
    ///
    /// # Errors
    /// `InvalidArgument` if the username or password is empty.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.username.is_empty() {
            return Err(SessionError::InvalidArgument("username must not be empty"));
        }
        if self.password.is_empty() {
            return Err(SessionError::InvalidArgument("password must not be empty"));
        }
        Ok(())
    }
}
