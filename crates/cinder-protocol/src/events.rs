//! Events published to subscribers.
//!
//! [`Event`] is a closed enum: every notification the client can raise has
//! exactly one variant, carrying only the data relevant to it. Handlers
//! publish on the [`EventBus`]; any number of subscribers receive every
//! event in publication order.

use std::net::Ipv4Addr;

use tokio::sync::broadcast;

use crate::enums::{
    ChatAction, ChatActionResult, ChatEntryType, ChatMemberStateChange, ChatRoomEnterResponse,
    ChatRoomType, ClanRelationship, EResult, FriendRelationship, PersonaState,
};
use crate::types::{AccountFlags, PersonaStateFlags, SteamId};

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Everything the server reports in a successful logon response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoggedOnDetails {
    pub steam_id: SteamId,
    pub session_id: i32,
    pub out_of_game_heartbeat_seconds: i32,
    pub in_game_heartbeat_seconds: i32,
    pub public_ip: Option<Ipv4Addr>,
    /// Server clock, seconds since the Unix epoch.
    pub server_time: u32,
    pub account_flags: AccountFlags,
    pub cell_id: u32,
    pub cell_id_ping_threshold: u32,
    pub email_domain: Option<String>,
    pub vanity_url: Option<String>,
    pub ip_country_code: Option<String>,
    pub client_supplied_steam_id: Option<SteamId>,
    pub count_login_failures_to_migrate: u32,
    pub count_disconnects_to_migrate: u32,
    pub webapi_authenticate_user_nonce: Option<String>,
    pub client_instance_id: Option<u64>,
}

/// Account snapshot sent right after logon.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccountInfo {
    pub persona_name: String,
    pub country: String,
    pub password_salt: Vec<u8>,
    pub password_digest: Vec<u8>,
    pub authed_computers: i32,
    pub locked_with_ipt: bool,
    pub flags: AccountFlags,
    pub facebook_id: u64,
    pub facebook_name: String,
}

/// Presence of one user.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonaStateUpdate {
    pub steam_id: SteamId,
    pub name: Option<String>,
    pub state: PersonaState,
    pub flags: PersonaStateFlags,
    pub game_app_id: u32,
    pub game_id: u64,
    pub game_name: Option<String>,
}

/// Result of joining a chat room.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEnteredDetails {
    pub chat_room: SteamId,
    pub friend: SteamId,
    pub room_type: ChatRoomType,
    pub owner: SteamId,
    pub clan: SteamId,
    pub chat_flags: u8,
    pub enter_response: ChatRoomEnterResponse,
    pub name: String,
    pub member_count: usize,
}

/// An invitation into a chat room.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatInviteDetails {
    pub invited: SteamId,
    pub chat_room: SteamId,
    pub patron: SteamId,
    pub room_type: ChatRoomType,
    pub friend_chat: SteamId,
    pub chat_name: String,
    pub game_id: u64,
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Every notification the client raises.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The logon succeeded and the session is established.
    LoggedOn(Box<LoggedOnDetails>),
    /// The server ended the session.
    LoggedOff { result: EResult },
    /// The logon was rejected. If `result` asks for a second factor the
    /// caller may log on again with the code.
    LogOnFailed { result: EResult },
    /// A key that can replace the password on the next logon.
    LoginKey { unique_id: u32, login_key: String },
    /// SHA-1 of the machine-auth blob; persist it to skip second-factor
    /// challenges on this machine.
    MachineAuthUpdated { hash: [u8; 20] },
    AccountInfo(Box<AccountInfo>),
    /// A full friends list was applied to the cache.
    FriendsListLoaded,
    FriendRelationshipChanged {
        steam_id: SteamId,
        relationship: FriendRelationship,
    },
    GroupRelationshipChanged {
        steam_id: SteamId,
        relationship: ClanRelationship,
    },
    PersonaState(Box<PersonaStateUpdate>),
    ClanState { clan: SteamId, name: Option<String> },
    FriendAdded {
        result: EResult,
        steam_id: SteamId,
        persona_name: String,
    },
    IgnoreFriendResult { result: EResult },
    /// A chat line. `chat_room` is `None` for one-to-one messages.
    ChatMessage {
        chat_room: Option<SteamId>,
        sender: SteamId,
        message: String,
        entry_type: ChatEntryType,
    },
    ChatEntered(Box<ChatEnteredDetails>),
    ChatMemberStateChanged {
        chat_room: SteamId,
        acted_on: SteamId,
        change: ChatMemberStateChange,
        acted_by: SteamId,
    },
    ChatActionResult {
        chat_room: SteamId,
        target: SteamId,
        action: ChatAction,
        result: ChatActionResult,
    },
    ChatInvite(Box<ChatInviteDetails>),
    /// The connection is gone; no more events follow for this session.
    Disconnected,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

pub type EventReceiver = broadcast::Receiver<Event>;

/// Fan-out of events to any number of subscribers.
///
/// Publishing never blocks and never fails: with no subscribers the event
/// is simply dropped, and a subscriber that falls more than `capacity`
/// events behind sees `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
