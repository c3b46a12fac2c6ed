//! Protocol enumerations.
//!
//! The server is free to send values this client has never heard of, so
//! every enum here is *open*: alongside the named variants there is an
//! `Other(raw)` variant that keeps the original number. Decoding an enum
//! therefore never fails, and re-encoding an unknown value gives back the
//! exact number the server sent.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declares an open enum backed by `u32`.
///
/// Generates `from_raw` / `raw`, `From` conversions in both directions,
/// `Display`, and serde support that (de)serializes the raw number.
macro_rules! open_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "u32", into = "u32")]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value without a name in this client.
            Other(u32),
        }

        impl $name {
            /// Maps a wire value to a variant, keeping unknown values.
            pub fn from_raw(raw: u32) -> Self {
                match raw {
                    $( $value => Self::$variant, )+
                    other => Self::Other(other),
                }
            }

            /// Returns the wire value.
            pub fn raw(self) -> u32 {
                match self {
                    $( Self::$variant => $value, )+
                    Self::Other(raw) => raw,
                }
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self::from_raw(raw)
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                value.raw()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    Self::Other(raw) => write!(f, "{}({raw})", stringify!($name)),
                    named => write!(f, "{named:?}"),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// EMsg
// ---------------------------------------------------------------------------

open_enum! {
    /// Message type carried in the first four bytes of every frame.
    ///
    /// Only the kinds this client sends or understands are named. Anything
    /// else arrives as `EMsg::Other` and is ignored by the dispatcher.
    pub enum EMsg {
        Invalid = 0,
        Multi = 1,
        ClientHeartBeat = 703,
        ClientRemoveFriend = 714,
        ClientChangeStatus = 716,
        ClientLogOnResponse = 751,
        ClientLoggedOff = 757,
        ClientPersonaState = 766,
        ClientFriendsList = 767,
        ClientAccountInfo = 768,
        ClientAddFriend = 791,
        ClientAddFriendResponse = 792,
        ClientChatMsg = 799,
        ClientClanState = 822,
        ClientJoinChat = 823,
        ClientSessionToken = 850,
        ClientSetIgnoreFriend = 855,
        ClientSetIgnoreFriendResponse = 856,
        ClientChatInvite = 5426,
        ClientFriendMsg = 5427,
        ClientFriendMsgIncoming = 5428,
        ClientChatEnter = 5430,
        ClientChatMemberInfo = 5431,
        ClientChatAction = 5433,
        ClientChatActionResult = 5434,
        ClientNewLoginKey = 5463,
        ClientNewLoginKeyAccepted = 5464,
        ClientMarketingMessageUpdate2 = 5510,
        ClientLogon = 5514,
        ClientWalletInfoUpdate = 5528,
        ClientUpdateMachineAuth = 5537,
        ClientUpdateMachineAuthResponse = 5538,
        ClientRequestWebAPIAuthenticateUserNonceResponse = 5586,
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

open_enum! {
    /// Result code attached to responses.
    pub enum EResult {
        Invalid = 0,
        Ok = 1,
        Fail = 2,
        NoConnection = 3,
        InvalidPassword = 5,
        LoggedInElsewhere = 6,
        InvalidProtocolVer = 7,
        InvalidParam = 8,
        FileNotFound = 9,
        AccessDenied = 15,
        Timeout = 16,
        Banned = 17,
        AccountNotFound = 18,
        ServiceUnavailable = 20,
        NotLoggedOn = 21,
        LimitExceeded = 25,
        Expired = 27,
        AlreadyRedeemed = 28,
        Blocked = 40,
        Ignored = 41,
        TryAnotherCM = 48,
        AccountLogonDenied = 63,
        InvalidLoginAuthCode = 65,
        RateLimitExceeded = 84,
        AccountLogonDeniedNeedTwoFactor = 85,
        TwoFactorCodeMismatch = 88,
    }
}

impl EResult {
    /// Maps the signed form used by protobuf `int32` fields.
    pub fn from_i32(raw: i32) -> Self {
        Self::from_raw(raw as u32)
    }

    /// Results that mean "this node can't serve you right now".
    ///
    /// They are not failures of the logon itself: the server will drop the
    /// connection and the caller reconnects somewhere else.
    pub fn is_transient_logon_failure(self) -> bool {
        matches!(self, Self::Fail | Self::ServiceUnavailable | Self::TryAnotherCM)
    }

    /// Results that ask for a second factor before the logon can succeed.
    pub fn needs_second_factor(self) -> bool {
        matches!(
            self,
            Self::AccountLogonDenied
                | Self::InvalidLoginAuthCode
                | Self::AccountLogonDeniedNeedTwoFactor
                | Self::TwoFactorCodeMismatch
        )
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

open_enum! {
    /// Account kind embedded in bits 52..56 of a [`SteamId`](crate::SteamId).
    pub enum AccountType {
        Invalid = 0,
        Individual = 1,
        Multiseat = 2,
        GameServer = 3,
        AnonGameServer = 4,
        Pending = 5,
        ContentServer = 6,
        Clan = 7,
        Chat = 8,
        ConsoleUser = 9,
        AnonUser = 10,
    }
}

open_enum! {
    /// Universe embedded in the top byte of a [`SteamId`](crate::SteamId).
    pub enum Universe {
        Invalid = 0,
        Public = 1,
        Beta = 2,
        Internal = 3,
        Dev = 4,
    }
}

// ---------------------------------------------------------------------------
// Social
// ---------------------------------------------------------------------------

open_enum! {
    /// Relationship between the local account and another user.
    pub enum FriendRelationship {
        None = 0,
        Blocked = 1,
        RequestRecipient = 2,
        Friend = 3,
        RequestInitiator = 4,
        Ignored = 5,
        IgnoredFriend = 6,
    }
}

open_enum! {
    /// Relationship between the local account and a clan.
    pub enum ClanRelationship {
        None = 0,
        Blocked = 1,
        Invited = 2,
        Member = 3,
        Kicked = 4,
        KickAcknowledged = 5,
    }
}

open_enum! {
    /// Online status shown to friends.
    pub enum PersonaState {
        Offline = 0,
        Online = 1,
        Busy = 2,
        Away = 3,
        Snooze = 4,
        LookingToTrade = 5,
        LookingToPlay = 6,
    }
}

open_enum! {
    /// Rank of a member inside a clan chat.
    pub enum ClanRank {
        None = 0,
        Owner = 1,
        Officer = 2,
        Member = 3,
        Moderator = 4,
    }
}

impl ClanRank {
    /// Maps the rank value found in a chat-member record.
    ///
    /// Those records number ranks differently from the rest of the
    /// protocol: 4 is a plain member and 8 a moderator. Anything else is
    /// passed through unchanged.
    pub fn from_member_record(raw: u32) -> Self {
        match raw {
            4 => Self::Member,
            8 => Self::Moderator,
            other => Self::from_raw(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

open_enum! {
    /// Kind of a chat line.
    pub enum ChatEntryType {
        Invalid = 0,
        ChatMsg = 1,
        Typing = 2,
        InviteGame = 3,
        Emote = 4,
        LeftConversation = 6,
        Entered = 7,
        WasKicked = 8,
        WasBanned = 9,
        Disconnected = 10,
        HistoricalChat = 11,
    }
}

open_enum! {
    /// What happened to a member of a chat room.
    pub enum ChatMemberStateChange {
        Entered = 0x01,
        Left = 0x02,
        Disconnected = 0x04,
        Kicked = 0x08,
        Banned = 0x10,
        VoiceSpeaking = 0x1000,
        VoiceDoneSpeaking = 0x2000,
    }
}

impl ChatMemberStateChange {
    /// True when the member is no longer in the room.
    pub fn is_departure(self) -> bool {
        matches!(
            self,
            Self::Left | Self::Disconnected | Self::Kicked | Self::Banned
        )
    }
}

open_enum! {
    /// Sub-kind of a chat member info message.
    pub enum ChatInfoType {
        StateChange = 1,
        InfoUpdate = 2,
        MemberLimitChange = 3,
    }
}

open_enum! {
    /// Moderation action requested on a chat room member.
    pub enum ChatAction {
        InviteChat = 1,
        Kick = 2,
        Ban = 3,
        UnBan = 4,
        StartVoiceSpeak = 5,
        EndVoiceSpeak = 6,
        LockChat = 7,
        UnlockChat = 8,
        CloseChat = 9,
        SetJoinable = 10,
        SetUnjoinable = 11,
        SetOwner = 12,
        SetInvisibleToFriends = 13,
        SetVisibleToFriends = 14,
        SetModerated = 15,
        SetUnmoderated = 16,
    }
}

open_enum! {
    /// Outcome of a [`ChatAction`].
    pub enum ChatActionResult {
        Success = 1,
        Error = 2,
        NotPermitted = 3,
        NotAllowedOnClanMember = 4,
        NotAllowedOnBannedUser = 5,
        NotAllowedOnChatOwner = 6,
        NotAllowedOnSelf = 7,
        ChatDoesntExist = 8,
        ChatFull = 9,
        VoiceSlotsFull = 10,
    }
}

open_enum! {
    /// Kind of chat room.
    pub enum ChatRoomType {
        Friend = 1,
        MUC = 2,
        Lobby = 3,
    }
}

open_enum! {
    /// Server answer to a join request.
    pub enum ChatRoomEnterResponse {
        Success = 1,
        DoesntExist = 2,
        NotAllowed = 3,
        Full = 4,
        Error = 5,
        Banned = 6,
        Limited = 7,
        ClanDisabled = 8,
        CommunityBan = 9,
        MemberBlockedYou = 10,
        YouBlockedMember = 11,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
