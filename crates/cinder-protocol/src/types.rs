//! Identity types shared by every Cinder crate.
//!
//! The protocol addresses everything (users, clans, chat rooms) with a
//! single 64-bit number. The number is packed with several fields, and
//! [`SteamId`] gives named access to them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::enums::{AccountType, Universe};

// ---------------------------------------------------------------------------
// SteamId
// ---------------------------------------------------------------------------

/// Instance flags used by chat-room ids.
pub mod chat_instance {
    /// The chat room belongs to a clan.
    pub const CLAN: u32 = 0x80000;
    /// The chat room is a game lobby.
    pub const LOBBY: u32 = 0x40000;
    /// The chat room is a matchmaking lobby.
    pub const MMS_LOBBY: u32 = 0x20000;
}

const ACCOUNT_ID_MASK: u64 = 0xFFFF_FFFF;
const INSTANCE_SHIFT: u32 = 32;
const INSTANCE_MASK: u64 = 0x000F_FFFF;
const TYPE_SHIFT: u32 = 52;
const TYPE_MASK: u64 = 0xF;
const UNIVERSE_SHIFT: u32 = 56;
const UNIVERSE_MASK: u64 = 0xFF;

/// A 64-bit account identifier.
///
/// Layout, from the least significant bit:
///
/// ```text
/// bits  0..32  account id
/// bits 32..52  instance
/// bits 52..56  account type
/// bits 56..64  universe
/// ```
///
/// `SteamId` is `Copy` and compares by its raw value, so it works as a
/// `HashMap` key. `#[serde(transparent)]` makes it serialize as the plain
/// number.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SteamId(pub u64);

impl SteamId {
    /// Builds an id from its parts.
    pub fn new(
        account_id: u32,
        instance: u32,
        account_type: AccountType,
        universe: Universe,
    ) -> Self {
        let raw = u64::from(account_id)
            | (u64::from(instance) & INSTANCE_MASK) << INSTANCE_SHIFT
            | (u64::from(account_type.raw()) & TYPE_MASK) << TYPE_SHIFT
            | (u64::from(universe.raw()) & UNIVERSE_MASK) << UNIVERSE_SHIFT;
        Self(raw)
    }

    /// The id a client logs on with before the server assigns the real one:
    /// an individual account in the public universe with instance 1.
    pub fn logon_placeholder() -> Self {
        Self::new(0, 1, AccountType::Individual, Universe::Public)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn account_id(self) -> u32 {
        (self.0 & ACCOUNT_ID_MASK) as u32
    }

    pub fn instance(self) -> u32 {
        ((self.0 >> INSTANCE_SHIFT) & INSTANCE_MASK) as u32
    }

    pub fn account_type(self) -> AccountType {
        AccountType::from_raw(((self.0 >> TYPE_SHIFT) & TYPE_MASK) as u32)
    }

    pub fn universe(self) -> Universe {
        Universe::from_raw(((self.0 >> UNIVERSE_SHIFT) & UNIVERSE_MASK) as u32)
    }

    pub fn is_clan(self) -> bool {
        self.account_type() == AccountType::Clan
    }

    pub fn is_chat(self) -> bool {
        self.account_type() == AccountType::Chat
    }

    /// True for ids that address a person (individual or console user).
    pub fn is_individual(self) -> bool {
        matches!(
            self.account_type(),
            AccountType::Individual | AccountType::ConsoleUser
        )
    }

    fn with_instance(self, instance: u32) -> Self {
        let cleared = self.0 & !(INSTANCE_MASK << INSTANCE_SHIFT);
        Self(cleared | (u64::from(instance) & INSTANCE_MASK) << INSTANCE_SHIFT)
    }

    fn with_account_type(self, account_type: AccountType) -> Self {
        let cleared = self.0 & !(TYPE_MASK << TYPE_SHIFT);
        Self(cleared | (u64::from(account_type.raw()) & TYPE_MASK) << TYPE_SHIFT)
    }

    /// Converts a clan id into the id of its chat room.
    ///
    /// Any other id is returned unchanged.
    pub fn to_chat_room(self) -> Self {
        if self.is_clan() {
            self.with_instance(chat_instance::CLAN)
                .with_account_type(AccountType::Chat)
        } else {
            self
        }
    }

    /// Converts a clan chat-room id back into the id of its clan.
    ///
    /// Any other id is returned unchanged.
    pub fn to_clan(self) -> Self {
        if self.is_chat() && self.instance() & chat_instance::CLAN != 0 {
            self.with_instance(0).with_account_type(AccountType::Clan)
        } else {
            self
        }
    }
}

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SteamId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<SteamId> for u64 {
    fn from(id: SteamId) -> u64 {
        id.0
    }
}

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// Correlation token pairing a request with its response.
///
/// A reply sets its *target* job id to the *source* job id of the request
/// it answers. `JobId::NONE` (all bits set) means "no job".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    pub const NONE: JobId = JobId(u64::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Flag sets
// ---------------------------------------------------------------------------

macro_rules! flag_set {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub fn bits(self) -> u32 {
                self.0
            }

            pub fn contains(self, flag: u32) -> bool {
                self.0 & flag == flag
            }
        }
    };
}

flag_set! {
    /// Permission bits of a chat room member.
    ChatPermissions
}

flag_set! {
    /// Extra presence bits attached to a persona state.
    PersonaStateFlags
}

flag_set! {
    /// Account-level flags reported at logon and in account info.
    AccountFlags
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
