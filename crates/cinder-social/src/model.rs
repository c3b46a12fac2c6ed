//! Cached entities.

use std::sync::Arc;

use cinder_protocol::{
    ChatPermissions, ClanRank, ClanRelationship, FriendRelationship, PersonaState,
    PersonaStateFlags, SteamId,
};

use crate::cache::{Keyed, Store};

pub type ChatMemberStore = Store<ChatMember>;

// ---------------------------------------------------------------------------
// Friend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Friend {
    pub steam_id: SteamId,
    pub name: String,
    pub relationship: FriendRelationship,
    pub persona_state: PersonaState,
    pub persona_state_flags: PersonaStateFlags,
    pub game_app_id: u32,
    pub game_id: u64,
    pub game_name: String,
}

impl Friend {
    pub fn new(steam_id: SteamId, relationship: FriendRelationship) -> Self {
        Self {
            steam_id,
            name: String::new(),
            relationship,
            persona_state: PersonaState::Offline,
            persona_state_flags: PersonaStateFlags::default(),
            game_app_id: 0,
            game_id: 0,
            game_name: String::new(),
        }
    }

    /// True if the friend is playing something.
    pub fn is_in_game(&self) -> bool {
        self.game_id != 0 || self.game_app_id != 0
    }
}

impl Keyed for Friend {
    fn key(&self) -> SteamId {
        self.steam_id
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// A clan, always keyed by its clan id (never the chat-room form).
///
/// Clones share the same member store: a group copied out of a snapshot
/// still sees live membership.
#[derive(Debug, Clone)]
pub struct Group {
    pub steam_id: SteamId,
    pub name: String,
    pub relationship: ClanRelationship,
    members: Arc<ChatMemberStore>,
}

impl Group {
    pub fn new(steam_id: SteamId, relationship: ClanRelationship) -> Self {
        Self {
            steam_id,
            name: String::new(),
            relationship,
            members: Arc::new(ChatMemberStore::new()),
        }
    }

    /// Members of the group's chat room.
    pub fn members(&self) -> &Arc<ChatMemberStore> {
        &self.members
    }
}

impl Keyed for Group {
    fn key(&self) -> SteamId {
        self.steam_id
    }
}

// ---------------------------------------------------------------------------
// ChatMember
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatMember {
    pub steam_id: SteamId,
    pub permissions: ChatPermissions,
    pub rank: ClanRank,
}

impl Keyed for ChatMember {
    fn key(&self) -> SteamId {
        self.steam_id
    }
}
