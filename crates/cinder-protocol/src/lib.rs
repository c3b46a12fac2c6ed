//! Wire protocol for Cinder.
//!
//! This crate holds everything both sides of a connection agree on:
//!
//! - **Types** ([`SteamId`], [`JobId`], the open enums) that name things
//!   on the wire.
//! - **Envelopes** ([`PacketMsg`], [`OutboundMsg`]) and the
//!   [`FrameCodec`] that turns them into frames.
//! - **Bodies**: protobuf in [`messages`], fixed legacy structs in
//!   [`legacy`], and the positional sub-record decoder in [`records`].
//! - **Events** ([`Event`], [`EventBus`]) handlers publish, and the
//!   [`Outbox`] they send through.
//!
//! ```text
//! Transport (frames) → FrameCodec (PacketMsg) → PacketHandler → Event
//! ```

mod codec;
mod envelope;
mod enums;
mod error;
mod events;
mod handler;
pub mod legacy;
pub mod messages;
mod outbox;
pub mod records;
mod types;

pub use codec::{FrameCodec, SteamCodec, MAX_INFLATED_SIZE};
pub use envelope::{Identity, MsgHeader, OutboundBody, OutboundMsg, PacketMsg};
pub use enums::{
    AccountType, ChatAction, ChatActionResult, ChatEntryType, ChatInfoType,
    ChatMemberStateChange, ChatRoomEnterResponse, ChatRoomType, ClanRank,
    ClanRelationship, EMsg, EResult, FriendRelationship, PersonaState, Universe,
};
pub use error::{HandlerError, ProtocolError};
pub use events::{
    AccountInfo, ChatEnteredDetails, ChatInviteDetails, Event, EventBus, EventReceiver,
    LoggedOnDetails, PersonaStateUpdate,
};
pub use handler::PacketHandler;
pub use outbox::{OutboundReceiver, Outbox};
pub use types::{
    chat_instance, AccountFlags, ChatPermissions, JobId, PersonaStateFlags, SteamId,
};

/// Protocol version sent in the logon request.
pub const PROTOCOL_VERSION: u32 = 65580;
