//! Social subsystem: the friends/groups cache, its handlers and the
//! outbound social API.
//!
//! All cache writes happen on the dispatch path, one packet at a time, so
//! the cache always reflects server updates in the order they arrived.
//! Events are collected while the cache is updated and published only once
//! every store lock has been released.

use std::collections::HashSet;
use std::sync::Arc;

use cinder_protocol::legacy::{
    MsgClientChatAction, MsgClientChatActionResult, MsgClientChatEnter, MsgClientChatMemberInfo,
    MsgClientChatMsg, MsgClientJoinChat, MsgClientSetIgnoreFriend,
    MsgClientSetIgnoreFriendResponse,
};
use cinder_protocol::messages::{
    CMsgClientAccountInfo, CMsgClientAddFriend, CMsgClientAddFriendResponse,
    CMsgClientChangeStatus, CMsgClientChatInvite, CMsgClientClanState, CMsgClientFriendMsg,
    CMsgClientFriendMsgIncoming, CMsgClientFriendsList, CMsgClientPersonaState,
    CMsgClientRemoveFriend,
};
use cinder_protocol::records::{self, ChatRoomEnterPayload};
use cinder_protocol::{
    AccountType, ChatAction, ChatEnteredDetails, ChatEntryType, ChatInfoType, ChatInviteDetails,
    ChatMemberStateChange, ChatRoomEnterResponse, ChatRoomType, ClanRelationship, EMsg, EResult,
    Event, EventBus, FriendRelationship, HandlerError, OutboundMsg, Outbox, PacketHandler,
    PacketMsg, PersonaState, PersonaStateFlags, PersonaStateUpdate, ProtocolError, SteamId,
};
use cinder_session::{Session, SessionState};
use parking_lot::RwLock;

use crate::model::{ChatMember, ChatMemberStore, Friend, Group};
use crate::{SocialError, Store};

/// Our own persona as last reported by the server.
#[derive(Debug, Clone)]
struct OwnPersona {
    name: String,
    state: PersonaState,
}

pub struct Social {
    session: Arc<Session>,
    outbox: Outbox,
    events: EventBus,
    friends: Store<Friend>,
    groups: Store<Group>,
    persona: RwLock<OwnPersona>,
}

impl Social {
    pub fn new(session: Arc<Session>, outbox: Outbox, events: EventBus) -> Self {
        Self {
            session,
            outbox,
            events,
            friends: Store::new(),
            groups: Store::new(),
            persona: RwLock::new(OwnPersona {
                name: String::new(),
                state: PersonaState::Offline,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn friends(&self) -> &Store<Friend> {
        &self.friends
    }

    pub fn groups(&self) -> &Store<Group> {
        &self.groups
    }

    /// Chat members of a group, by clan id or clan chat-room id.
    pub fn chat_members(&self, id: SteamId) -> Option<Arc<ChatMemberStore>> {
        self.groups
            .get(id.to_clan())
            .map(|group| Arc::clone(group.members()))
    }

    pub fn persona_name(&self) -> String {
        self.persona.read().name.clone()
    }

    pub fn persona_state(&self) -> PersonaState {
        self.persona.read().state
    }

    /// Members store of `chat_room`'s group, creating the group if needed.
    fn members_of(&self, chat_room: SteamId) -> Arc<ChatMemberStore> {
        let clan = chat_room.to_clan();
        let group = self
            .groups
            .upsert_with(clan, || Group::new(clan, ClanRelationship::None), |_| {});
        Arc::clone(group.members())
    }

    // -----------------------------------------------------------------------
    // Outbound API
    // -----------------------------------------------------------------------

    /// Changes our display name.
    pub fn set_persona_name(&self, name: &str) -> Result<(), SocialError> {
        if name.is_empty() {
            return Err(SocialError::InvalidArgument("persona name must not be empty"));
        }
        let state = {
            let mut persona = self.persona.write();
            persona.name = name.to_owned();
            persona.state
        };
        let body = CMsgClientChangeStatus {
            persona_state: Some(state.raw()),
            player_name: Some(name.to_owned()),
        };
        self.outbox.send(OutboundMsg::proto(EMsg::ClientChangeStatus, &body));
        Ok(())
    }

    /// Changes our online status.
    pub fn set_persona_state(&self, state: PersonaState) {
        self.persona.write().state = state;
        let body = CMsgClientChangeStatus {
            persona_state: Some(state.raw()),
            player_name: None,
        };
        self.outbox.send(OutboundMsg::proto(EMsg::ClientChangeStatus, &body));
    }

    /// Sends a chat line to a friend or a chat room, chosen by the account
    /// type of `to`.
    ///
    /// # Errors
    /// `UnsupportedRecipient` if `to` is neither a person nor a clan/chat.
    pub fn send_message(
        &self,
        to: SteamId,
        entry_type: ChatEntryType,
        message: &str,
    ) -> Result<(), SocialError> {
        match to.account_type() {
            AccountType::Individual | AccountType::ConsoleUser => {
                self.send_chat_message(to, entry_type, message);
                Ok(())
            }
            AccountType::Clan | AccountType::Chat => {
                self.send_chat_room_message(to, entry_type, message);
                Ok(())
            }
            _ => Err(SocialError::UnsupportedRecipient(to)),
        }
    }

    /// Sends a one-to-one message.
    pub fn send_chat_message(&self, to: SteamId, entry_type: ChatEntryType, message: &str) {
        let body = CMsgClientFriendMsg {
            steamid: Some(to.raw()),
            chat_entry_type: Some(entry_type.raw() as i32),
            message: Some(message.as_bytes().to_vec()),
        };
        self.outbox.send(OutboundMsg::proto(EMsg::ClientFriendMsg, &body));
    }

    /// Sends a message to a chat room; clan ids are converted to their room.
    pub fn send_chat_room_message(&self, room: SteamId, entry_type: ChatEntryType, message: &str) {
        let body = MsgClientChatMsg {
            chatter: self.session.steam_id(),
            chat_room: room.to_chat_room(),
            entry_type,
        };
        let mut text = Vec::with_capacity(message.len() + 1);
        text.extend_from_slice(message.as_bytes());
        text.push(0);
        self.outbox.send(OutboundMsg::legacy(EMsg::ClientChatMsg, &body, &text));
    }

    pub fn add_friend(&self, id: SteamId) {
        let body = CMsgClientAddFriend {
            steamid_to_add: Some(id.raw()),
            accountname_or_email_to_add: None,
        };
        self.outbox.send(OutboundMsg::proto(EMsg::ClientAddFriend, &body));
    }

    /// Sends a friend request by account name or e-mail address.
    pub fn add_friend_by_name(&self, name_or_email: &str) -> Result<(), SocialError> {
        if name_or_email.is_empty() {
            return Err(SocialError::InvalidArgument("account name must not be empty"));
        }
        let body = CMsgClientAddFriend {
            steamid_to_add: None,
            accountname_or_email_to_add: Some(name_or_email.to_owned()),
        };
        self.outbox.send(OutboundMsg::proto(EMsg::ClientAddFriend, &body));
        Ok(())
    }

    pub fn remove_friend(&self, id: SteamId) {
        let body = CMsgClientRemoveFriend {
            friendid: Some(id.raw()),
        };
        self.outbox.send(OutboundMsg::proto(EMsg::ClientRemoveFriend, &body));
    }

    /// Ignores (`true`) or un-ignores a user.
    pub fn ignore_friend(&self, id: SteamId, ignore: bool) {
        let body = MsgClientSetIgnoreFriend {
            my_id: self.session.steam_id(),
            friend: id,
            ignore,
        };
        self.outbox.send(OutboundMsg::legacy(EMsg::ClientSetIgnoreFriend, &body, &[]));
    }

    /// Joins a chat room; clan ids are converted to their room.
    pub fn join_chat(&self, id: SteamId) {
        let body = MsgClientJoinChat {
            chat_room: id.to_chat_room(),
            is_voice_speaker: false,
        };
        self.outbox.send(OutboundMsg::legacy(EMsg::ClientJoinChat, &body, &[]));
    }

    /// Leaves a chat room by announcing our own `Left` state change.
    pub fn leave_chat(&self, id: SteamId) {
        let me = self.session.steam_id();
        let body = MsgClientChatMemberInfo {
            chat_room: id.to_chat_room(),
            info_type: ChatInfoType::StateChange,
        };
        let mut payload = Vec::with_capacity(20);
        payload.extend_from_slice(&me.raw().to_le_bytes());
        payload.extend_from_slice(&ChatMemberStateChange::Left.raw().to_le_bytes());
        payload.extend_from_slice(&me.raw().to_le_bytes());
        self.outbox.send(OutboundMsg::legacy(EMsg::ClientChatMemberInfo, &body, &payload));
    }

    pub fn kick_chat_member(&self, room: SteamId, user: SteamId) {
        self.chat_action(room, user, ChatAction::Kick);
    }

    pub fn ban_chat_member(&self, room: SteamId, user: SteamId) {
        self.chat_action(room, user, ChatAction::Ban);
    }

    pub fn unban_chat_member(&self, room: SteamId, user: SteamId) {
        self.chat_action(room, user, ChatAction::UnBan);
    }

    fn chat_action(&self, room: SteamId, user: SteamId, action: ChatAction) {
        let body = MsgClientChatAction {
            chat_room: room.to_chat_room(),
            target: user,
            action,
        };
        self.outbox.send(OutboundMsg::legacy(EMsg::ClientChatAction, &body, &[]));
    }

    // -----------------------------------------------------------------------
    // Friends and groups
    // -----------------------------------------------------------------------

    fn handle_friends_list(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let list: CMsgClientFriendsList = packet.read_proto().map_err(HandlerError::ProtocolViolation)?;
        let incremental = list.bincremental.unwrap_or(false);
        let mut changes = Vec::new();
        let mut listed = HashSet::with_capacity(list.friends.len());

        for entry in &list.friends {
            let id = SteamId(entry.ulfriendid.unwrap_or_default());
            let raw = entry.efriendrelationship.unwrap_or_default();
            listed.insert(id);

            if id.is_clan() {
                let relationship = ClanRelationship::from_raw(raw);
                if relationship == ClanRelationship::None {
                    self.groups.remove(id);
                } else {
                    self.groups.upsert_with(
                        id,
                        || Group::new(id, relationship),
                        |group| group.relationship = relationship,
                    );
                }
                changes.push(Event::GroupRelationshipChanged {
                    steam_id: id,
                    relationship,
                });
            } else {
                let relationship = FriendRelationship::from_raw(raw);
                if relationship == FriendRelationship::None {
                    self.friends.remove(id);
                } else {
                    self.friends.upsert_with(
                        id,
                        || Friend::new(id, relationship),
                        |friend| friend.relationship = relationship,
                    );
                }
                changes.push(Event::FriendRelationshipChanged {
                    steam_id: id,
                    relationship,
                });
            }
        }

        if incremental {
            tracing::debug!(entries = changes.len(), "friends list delta applied");
            for event in changes {
                self.events.publish(event);
            }
        } else {
            // A full list replaces whatever was cached before, including
            // room-only groups created by membership events.
            self.friends.retain(|friend| listed.contains(&friend.steam_id));
            self.groups.retain(|group| listed.contains(&group.steam_id));
            tracing::debug!(
                friends = self.friends.len(),
                groups = self.groups.len(),
                "friends list loaded"
            );
            self.events.publish(Event::FriendsListLoaded);
        }
        Ok(())
    }

    fn handle_persona_state(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let body: CMsgClientPersonaState = packet.read_proto().map_err(HandlerError::ProtocolViolation)?;
        let me = self.session.steam_id();
        let mut updates = Vec::with_capacity(body.friends.len());

        for entry in body.friends {
            let id = SteamId(entry.friendid.unwrap_or_default());
            let name = entry.player_name.filter(|n| !n.is_empty());
            let state = PersonaState::from_raw(entry.persona_state.unwrap_or_default());
            let flags = PersonaStateFlags(entry.persona_state_flags.unwrap_or_default());

            if id == me {
                let mut persona = self.persona.write();
                if let Some(name) = &name {
                    persona.name.clone_from(name);
                }
                persona.state = state;
            } else if id.is_individual() {
                self.friends.update(id, |friend| {
                    if let Some(name) = &name {
                        friend.name.clone_from(name);
                    }
                    friend.persona_state = state;
                    friend.persona_state_flags = flags;
                    if let Some(app_id) = entry.game_played_app_id {
                        friend.game_app_id = app_id;
                    }
                    if let Some(game_id) = entry.gameid {
                        friend.game_id = game_id;
                    }
                    if let Some(game_name) = &entry.game_name {
                        friend.game_name.clone_from(game_name);
                    }
                });
            } else if id.is_clan() {
                if let Some(name) = &name {
                    self.groups.update(id, |group| group.name.clone_from(name));
                }
            }

            updates.push(PersonaStateUpdate {
                steam_id: id,
                name,
                state,
                flags,
                game_app_id: entry.game_played_app_id.unwrap_or_default(),
                game_id: entry.gameid.unwrap_or_default(),
                game_name: entry.game_name,
            });
        }

        for update in updates {
            self.events.publish(Event::PersonaState(Box::new(update)));
        }
        Ok(())
    }

    fn handle_clan_state(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let body: CMsgClientClanState = packet.read_proto().map_err(HandlerError::ProtocolViolation)?;
        let clan = SteamId(body.steamid_clan.unwrap_or_default());
        let name = body
            .name_info
            .and_then(|info| info.clan_name)
            .filter(|n| !n.is_empty());
        if let Some(name) = &name {
            self.groups.update(clan, |group| group.name.clone_from(name));
        }
        self.events.publish(Event::ClanState { clan, name });
        Ok(())
    }

    fn handle_account_info(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let body: CMsgClientAccountInfo = packet.read_proto().map_err(HandlerError::ProtocolViolation)?;
        if let Some(name) = body.persona_name {
            self.persona.write().name = name;
        }
        Ok(())
    }

    fn handle_add_friend_response(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let body: CMsgClientAddFriendResponse =
            packet.read_proto().map_err(HandlerError::ProtocolViolation)?;
        self.events.publish(Event::FriendAdded {
            result: EResult::from_i32(body.eresult.unwrap_or(2)),
            steam_id: SteamId(body.steam_id_added.unwrap_or_default()),
            persona_name: body.persona_name_added.unwrap_or_default(),
        });
        Ok(())
    }

    fn handle_ignore_response(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let (body, _) = packet
            .read_legacy::<MsgClientSetIgnoreFriendResponse>()
            .map_err(HandlerError::ProtocolViolation)?;
        self.events.publish(Event::IgnoreFriendResult {
            result: body.result,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    fn handle_friend_msg(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let body: CMsgClientFriendMsgIncoming =
            packet.read_proto().map_err(HandlerError::ProtocolViolation)?;
        let message = body.message.unwrap_or_default();
        self.events.publish(Event::ChatMessage {
            chat_room: None,
            sender: SteamId(body.steamid_from.unwrap_or_default()),
            message: cut_at_nul(&message),
            entry_type: ChatEntryType::from_raw(body.chat_entry_type.unwrap_or_default() as u32),
        });
        Ok(())
    }

    fn handle_chat_msg(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let (body, text) = packet
            .read_legacy::<MsgClientChatMsg>()
            .map_err(HandlerError::ProtocolViolation)?;
        self.events.publish(Event::ChatMessage {
            chat_room: Some(body.chat_room),
            sender: body.chatter,
            message: cut_at_nul(text),
            entry_type: body.entry_type,
        });
        Ok(())
    }

    fn handle_chat_enter(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let (body, rest) = packet
            .read_legacy::<MsgClientChatEnter>()
            .map_err(HandlerError::ProtocolViolation)?;

        let payload = if body.enter_response == ChatRoomEnterResponse::Success {
            records::decode_chat_enter_payload(rest).map_err(|source| malformed(packet, source))?
        } else {
            ChatRoomEnterPayload {
                name: String::new(),
                members: Vec::new(),
            }
        };

        let member_count = payload.members.len();
        if !payload.members.is_empty() {
            let members = self.members_of(body.chat_room);
            for record in payload.members {
                members.upsert(ChatMember {
                    steam_id: record.steam_id,
                    permissions: record.permissions,
                    rank: record.rank,
                });
            }
        }
        tracing::debug!(
            chat_room = %body.chat_room,
            response = %body.enter_response,
            members = member_count,
            "chat entered"
        );

        self.events.publish(Event::ChatEntered(Box::new(ChatEnteredDetails {
            chat_room: body.chat_room,
            friend: body.friend,
            room_type: body.room_type,
            owner: body.owner,
            clan: body.clan,
            chat_flags: body.chat_flags,
            enter_response: body.enter_response,
            name: payload.name,
            member_count,
        })));
        Ok(())
    }

    fn handle_chat_member_info(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let (body, rest) = packet
            .read_legacy::<MsgClientChatMemberInfo>()
            .map_err(HandlerError::ProtocolViolation)?;
        if body.info_type != ChatInfoType::StateChange {
            tracing::trace!(info_type = %body.info_type, "chat member info ignored");
            return Ok(());
        }

        let change =
            records::decode_member_state_change(rest).map_err(|source| malformed(packet, source))?;

        if let Some(record) = change.member {
            self.members_of(body.chat_room).upsert(ChatMember {
                steam_id: change.acted_on,
                permissions: record.permissions,
                rank: record.rank,
            });
        } else if change.change.is_departure() {
            if let Some(members) = self.chat_members(body.chat_room) {
                members.remove(change.acted_on);
            }
        }

        self.events.publish(Event::ChatMemberStateChanged {
            chat_room: body.chat_room,
            acted_on: change.acted_on,
            change: change.change,
            acted_by: change.acted_by,
        });
        Ok(())
    }

    fn handle_chat_action_result(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let (body, _) = packet
            .read_legacy::<MsgClientChatActionResult>()
            .map_err(HandlerError::ProtocolViolation)?;
        self.events.publish(Event::ChatActionResult {
            chat_room: body.chat_room,
            target: body.target,
            action: body.action,
            result: body.result,
        });
        Ok(())
    }

    fn handle_chat_invite(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let body: CMsgClientChatInvite = packet.read_proto().map_err(HandlerError::ProtocolViolation)?;
        self.events.publish(Event::ChatInvite(Box::new(ChatInviteDetails {
            invited: SteamId(body.steam_id_invited.unwrap_or_default()),
            chat_room: SteamId(body.steam_id_chat.unwrap_or_default()),
            patron: SteamId(body.steam_id_patron.unwrap_or_default()),
            room_type: ChatRoomType::from_raw(body.chatroom_type.unwrap_or_default() as u32),
            friend_chat: SteamId(body.steam_id_friend_chat.unwrap_or_default()),
            chat_name: body.chat_name.unwrap_or_default(),
            game_id: body.game_id.unwrap_or_default(),
        })));
        Ok(())
    }
}

/// Text up to the first NUL byte; invalid UTF-8 is replaced.
fn cut_at_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn malformed(packet: &PacketMsg, source: ProtocolError) -> HandlerError {
    HandlerError::Malformed {
        emsg: packet.emsg,
        source,
    }
}

impl PacketHandler for Social {
    fn name(&self) -> &'static str {
        "social"
    }

    fn handles(&self) -> &'static [EMsg] {
        &[
            EMsg::ClientPersonaState,
            EMsg::ClientClanState,
            EMsg::ClientFriendsList,
            EMsg::ClientFriendMsgIncoming,
            EMsg::ClientAccountInfo,
            EMsg::ClientAddFriendResponse,
            EMsg::ClientSetIgnoreFriendResponse,
            EMsg::ClientChatInvite,
            EMsg::ClientChatEnter,
            EMsg::ClientChatMsg,
            EMsg::ClientChatMemberInfo,
            EMsg::ClientChatActionResult,
        ]
    }

    fn handle_packet(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        if self.session.state() == SessionState::LoggedOff {
            tracing::trace!(emsg = %packet.emsg, "logged off, packet dropped");
            return Ok(());
        }
        match packet.emsg {
            EMsg::ClientPersonaState => self.handle_persona_state(packet),
            EMsg::ClientClanState => self.handle_clan_state(packet),
            EMsg::ClientFriendsList => self.handle_friends_list(packet),
            EMsg::ClientFriendMsgIncoming => self.handle_friend_msg(packet),
            EMsg::ClientAccountInfo => self.handle_account_info(packet),
            EMsg::ClientAddFriendResponse => self.handle_add_friend_response(packet),
            EMsg::ClientSetIgnoreFriendResponse => self.handle_ignore_response(packet),
            EMsg::ClientChatInvite => self.handle_chat_invite(packet),
            EMsg::ClientChatEnter => self.handle_chat_enter(packet),
            EMsg::ClientChatMsg => self.handle_chat_msg(packet),
            EMsg::ClientChatMemberInfo => self.handle_chat_member_info(packet),
            EMsg::ClientChatActionResult => self.handle_chat_action_result(packet),
            _ => Ok(()),
        }
    }
}
