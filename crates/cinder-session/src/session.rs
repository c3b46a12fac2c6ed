//! The session: who the client is and how far the logon has got.
//!
//! There is one [`Session`] per client. The auth handler writes it; every
//! other part of the client (social handlers, the outbound writer stamping
//! headers) reads it from whatever task it runs on. Identity fields are
//! atomics and the phase sits behind a `parking_lot::RwLock`, so reads never
//! block on a writer for long and never need `.await`.

use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::time::Duration;

use cinder_protocol::{Identity, SteamId};
use parking_lot::RwLock;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Logon phase of the session.
///
/// ```text
///   Disconnected ──(log_on)──→ LoggingOn ──(response OK)──→ LoggedOn
///                               │    ↑                         │
///                               │    └─(second factor needed)  │
///                               │                         (logged off)
///                               └──(rejected)──→ LoggedOff ←───┘
/// ```
///
/// `LoggedOff` is terminal for the connection. Tearing the connection down
/// returns the session to `Disconnected`, ready for the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    LoggingOn,
    LoggedOn,
    LoggedOff,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Session {
    steam_id: AtomicU64,
    session_id: AtomicI32,
    heartbeat_ms: AtomicU64,
    state: RwLock<SessionState>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            steam_id: AtomicU64::new(SteamId::logon_placeholder().raw()),
            session_id: AtomicI32::new(0),
            heartbeat_ms: AtomicU64::new(0),
            state: RwLock::new(SessionState::Disconnected),
        }
    }
}

impl Session {
    /// A disconnected session holding the logon placeholder id.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steam_id(&self) -> SteamId {
        SteamId(self.steam_id.load(Ordering::Acquire))
    }

    pub fn session_id(&self) -> i32 {
        self.session_id.load(Ordering::Acquire)
    }

    /// Identity to stamp on outbound headers.
    pub fn identity(&self) -> Identity {
        Identity {
            steam_id: self.steam_id(),
            session_id: self.session_id(),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn is_logged_on(&self) -> bool {
        self.state() == SessionState::LoggedOn
    }

    /// Interval of the running heartbeat, if any.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        match self.heartbeat_ms.load(Ordering::Acquire) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub(crate) fn set_steam_id(&self, id: SteamId) {
        self.steam_id.store(id.raw(), Ordering::Release);
    }

    pub(crate) fn set_identity(&self, id: SteamId, session_id: i32) {
        self.set_steam_id(id);
        self.session_id.store(session_id, Ordering::Release);
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        *self.state.write() = state;
    }

    /// Moves to `next` unless the current state is `forbidden`.
    ///
    /// Returns the state that was replaced, or `Err(current)`.
    pub(crate) fn transition_unless(
        &self,
        forbidden: SessionState,
        next: SessionState,
    ) -> Result<SessionState, SessionState> {
        let mut state = self.state.write();
        if *state == forbidden {
            return Err(*state);
        }
        Ok(std::mem::replace(&mut *state, next))
    }

    pub(crate) fn set_heartbeat_interval(&self, interval: Option<Duration>) {
        let ms = interval.map_or(0, |d| d.as_millis() as u64);
        self.heartbeat_ms.store(ms, Ordering::Release);
    }

    /// Forgets the session id and heartbeat after logoff or disconnect.
    pub(crate) fn clear(&self) {
        self.session_id.store(0, Ordering::Release);
        self.set_heartbeat_interval(None);
    }
}
