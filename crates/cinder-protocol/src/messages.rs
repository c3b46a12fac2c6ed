//! Protobuf message bodies.
//!
//! Only the messages and fields this client reads or writes are declared.
//! Tags match the server's schema; unknown fields in inbound messages are
//! skipped by prost.

use prost::Message;

use crate::enums::EResult;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Header preceding every protobuf-encoded body.
#[derive(Clone, PartialEq, Message)]
pub struct CMsgProtoBufHeader {
    #[prost(fixed64, optional, tag = "1")]
    pub steamid: Option<u64>,
    #[prost(int32, optional, tag = "2")]
    pub client_sessionid: Option<i32>,
    #[prost(fixed64, optional, tag = "10")]
    pub jobid_source: Option<u64>,
    #[prost(fixed64, optional, tag = "11")]
    pub jobid_target: Option<u64>,
    #[prost(string, optional, tag = "12")]
    pub target_job_name: Option<String>,
    #[prost(int32, optional, tag = "13")]
    pub eresult: Option<i32>,
    #[prost(string, optional, tag = "14")]
    pub error_message: Option<String>,
}

/// Container for several frames sent at once, optionally gzip-compressed.
#[derive(Clone, PartialEq, Message)]
pub struct CMsgMulti {
    #[prost(uint32, optional, tag = "1")]
    pub size_unzipped: Option<u32>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub message_body: Option<Vec<u8>>,
}

// ---------------------------------------------------------------------------
// Logon
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientLogon {
    #[prost(uint32, optional, tag = "1")]
    pub protocol_version: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub cell_id: Option<u32>,
    #[prost(string, optional, tag = "6")]
    pub client_language: Option<String>,
    #[prost(uint32, optional, tag = "7")]
    pub client_os_type: Option<u32>,
    #[prost(string, optional, tag = "50")]
    pub account_name: Option<String>,
    #[prost(string, optional, tag = "51")]
    pub password: Option<String>,
    #[prost(bool, optional, tag = "52")]
    pub should_remember_password: Option<bool>,
    #[prost(string, optional, tag = "60")]
    pub login_key: Option<String>,
    #[prost(bytes = "vec", optional, tag = "82")]
    pub sha_sentryfile: Option<Vec<u8>>,
    #[prost(int32, optional, tag = "83")]
    pub eresult_sentryfile: Option<i32>,
    #[prost(string, optional, tag = "84")]
    pub auth_code: Option<String>,
    #[prost(string, optional, tag = "85")]
    pub two_factor_code: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientLogonResponse {
    #[prost(int32, optional, tag = "1")]
    pub eresult: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub out_of_game_heartbeat_seconds: Option<i32>,
    #[prost(int32, optional, tag = "3")]
    pub in_game_heartbeat_seconds: Option<i32>,
    #[prost(uint32, optional, tag = "4")]
    pub public_ip: Option<u32>,
    #[prost(fixed32, optional, tag = "5")]
    pub rtime32_server_time: Option<u32>,
    #[prost(uint32, optional, tag = "6")]
    pub account_flags: Option<u32>,
    #[prost(uint32, optional, tag = "7")]
    pub cell_id: Option<u32>,
    #[prost(string, optional, tag = "8")]
    pub email_domain: Option<String>,
    #[prost(int32, optional, tag = "10")]
    pub eresult_extended: Option<i32>,
    #[prost(string, optional, tag = "11")]
    pub webapi_authenticate_user_nonce: Option<String>,
    #[prost(uint32, optional, tag = "12")]
    pub cell_id_ping_threshold: Option<u32>,
    #[prost(string, optional, tag = "14")]
    pub vanity_url: Option<String>,
    #[prost(fixed64, optional, tag = "20")]
    pub client_supplied_steamid: Option<u64>,
    #[prost(string, optional, tag = "21")]
    pub ip_country_code: Option<String>,
    #[prost(uint32, optional, tag = "24")]
    pub count_loginfailures_to_migrate: Option<u32>,
    #[prost(uint32, optional, tag = "25")]
    pub count_disconnects_to_migrate: Option<u32>,
    #[prost(uint64, optional, tag = "27")]
    pub client_instance_id: Option<u64>,
}

impl CMsgClientLogonResponse {
    pub fn result(&self) -> EResult {
        EResult::from_i32(self.eresult.unwrap_or(2))
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientLoggedOff {
    #[prost(int32, optional, tag = "1")]
    pub eresult: Option<i32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientNewLoginKey {
    #[prost(uint32, optional, tag = "1")]
    pub unique_id: Option<u32>,
    #[prost(string, optional, tag = "2")]
    pub login_key: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientNewLoginKeyAccepted {
    #[prost(uint32, optional, tag = "1")]
    pub unique_id: Option<u32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientUpdateMachineAuth {
    #[prost(string, optional, tag = "1")]
    pub filename: Option<String>,
    #[prost(uint32, optional, tag = "2")]
    pub offset: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub cubtowrite: Option<u32>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub bytes: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientUpdateMachineAuthResponse {
    #[prost(string, optional, tag = "1")]
    pub filename: Option<String>,
    #[prost(int32, optional, tag = "2")]
    pub eresult: Option<i32>,
    #[prost(uint32, optional, tag = "3")]
    pub filesize: Option<u32>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub sha_file: Option<Vec<u8>>,
    #[prost(uint32, optional, tag = "5")]
    pub getlasterror: Option<u32>,
    #[prost(uint32, optional, tag = "6")]
    pub offset: Option<u32>,
    #[prost(uint32, optional, tag = "7")]
    pub cubwrote: Option<u32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientAccountInfo {
    #[prost(string, optional, tag = "1")]
    pub persona_name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub ip_country: Option<String>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub salt_password: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub sha_digest_password: Option<Vec<u8>>,
    #[prost(int32, optional, tag = "5")]
    pub count_authed_computers: Option<i32>,
    #[prost(bool, optional, tag = "6")]
    pub locked_with_ipt: Option<bool>,
    #[prost(uint32, optional, tag = "7")]
    pub account_flags: Option<u32>,
    #[prost(uint64, optional, tag = "8")]
    pub facebook_id: Option<u64>,
    #[prost(string, optional, tag = "9")]
    pub facebook_name: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientHeartBeat {}

// ---------------------------------------------------------------------------
// Friends
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientChangeStatus {
    #[prost(uint32, optional, tag = "1")]
    pub persona_state: Option<u32>,
    #[prost(string, optional, tag = "2")]
    pub player_name: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientFriendMsg {
    #[prost(fixed64, optional, tag = "1")]
    pub steamid: Option<u64>,
    #[prost(int32, optional, tag = "2")]
    pub chat_entry_type: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub message: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientFriendMsgIncoming {
    #[prost(fixed64, optional, tag = "1")]
    pub steamid_from: Option<u64>,
    #[prost(int32, optional, tag = "2")]
    pub chat_entry_type: Option<i32>,
    #[prost(bool, optional, tag = "3")]
    pub from_limited_account: Option<bool>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub message: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientAddFriend {
    #[prost(fixed64, optional, tag = "1")]
    pub steamid_to_add: Option<u64>,
    #[prost(string, optional, tag = "2")]
    pub accountname_or_email_to_add: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientAddFriendResponse {
    #[prost(int32, optional, tag = "1")]
    pub eresult: Option<i32>,
    #[prost(fixed64, optional, tag = "2")]
    pub steam_id_added: Option<u64>,
    #[prost(string, optional, tag = "3")]
    pub persona_name_added: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientRemoveFriend {
    #[prost(fixed64, optional, tag = "1")]
    pub friendid: Option<u64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientFriendsList {
    #[prost(bool, optional, tag = "1")]
    pub bincremental: Option<bool>,
    #[prost(message, repeated, tag = "2")]
    pub friends: Vec<cmsg_client_friends_list::Friend>,
}

pub mod cmsg_client_friends_list {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Friend {
        #[prost(fixed64, optional, tag = "1")]
        pub ulfriendid: Option<u64>,
        #[prost(uint32, optional, tag = "2")]
        pub efriendrelationship: Option<u32>,
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientPersonaState {
    #[prost(uint32, optional, tag = "1")]
    pub status_flags: Option<u32>,
    #[prost(message, repeated, tag = "2")]
    pub friends: Vec<cmsg_client_persona_state::Friend>,
}

pub mod cmsg_client_persona_state {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Friend {
        #[prost(fixed64, optional, tag = "1")]
        pub friendid: Option<u64>,
        #[prost(uint32, optional, tag = "2")]
        pub persona_state: Option<u32>,
        #[prost(uint32, optional, tag = "3")]
        pub game_played_app_id: Option<u32>,
        #[prost(uint32, optional, tag = "6")]
        pub persona_state_flags: Option<u32>,
        #[prost(string, optional, tag = "15")]
        pub player_name: Option<String>,
        #[prost(string, optional, tag = "55")]
        pub game_name: Option<String>,
        #[prost(fixed64, optional, tag = "56")]
        pub gameid: Option<u64>,
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientClanState {
    #[prost(fixed64, optional, tag = "1")]
    pub steamid_clan: Option<u64>,
    #[prost(uint32, optional, tag = "3")]
    pub clan_account_flags: Option<u32>,
    #[prost(message, optional, tag = "4")]
    pub name_info: Option<cmsg_client_clan_state::NameInfo>,
}

pub mod cmsg_client_clan_state {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NameInfo {
        #[prost(string, optional, tag = "1")]
        pub clan_name: Option<String>,
        #[prost(bytes = "vec", optional, tag = "2")]
        pub sha_avatar: Option<Vec<u8>>,
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Message)]
pub struct CMsgClientChatInvite {
    #[prost(fixed64, optional, tag = "1")]
    pub steam_id_invited: Option<u64>,
    #[prost(fixed64, optional, tag = "2")]
    pub steam_id_chat: Option<u64>,
    #[prost(fixed64, optional, tag = "3")]
    pub steam_id_patron: Option<u64>,
    #[prost(int32, optional, tag = "4")]
    pub chatroom_type: Option<i32>,
    #[prost(fixed64, optional, tag = "5")]
    pub steam_id_friend_chat: Option<u64>,
    #[prost(string, optional, tag = "6")]
    pub chat_name: Option<String>,
    #[prost(fixed64, optional, tag = "7")]
    pub game_id: Option<u64>,
}
