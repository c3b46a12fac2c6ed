//! Fixed-layout bodies of legacy (non-protobuf) messages.
//!
//! A legacy message is a fixed little-endian struct followed by a free-form
//! payload. [`LegacyBody`] describes the fixed part; whatever follows it is
//! handed back to the caller untouched so the sub-record decoder in
//! [`records`](crate::records) can read it.

use bytes::{Buf, BufMut};

use crate::enums::{
    ChatAction, ChatActionResult, ChatEntryType, ChatInfoType, ChatRoomEnterResponse,
    ChatRoomType, EResult,
};
use crate::types::SteamId;
use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Bounds-checked little-endian reader over a byte slice.
///
/// Every read first checks that enough bytes remain and returns
/// [`ProtocolError::Truncated`] otherwise, so a short payload can never
/// panic.
#[derive(Debug)]
pub struct LegacyReader<'a> {
    buf: &'a [u8],
}

impl<'a> LegacyReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// The bytes not read yet.
    pub fn rest(&self) -> &'a [u8] {
        self.buf
    }

    fn ensure(&self, needed: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() < needed {
            return Err(ProtocolError::Truncated {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_u64(&mut self) -> Result<u64, ProtocolError> {
        self.ensure(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn read_steam_id(&mut self) -> Result<SteamId, ProtocolError> {
        self.read_u64().map(SteamId)
    }

    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        self.read_u8().map(|b| b != 0)
    }

    /// Skips `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<(), ProtocolError> {
        self.ensure(count)?;
        self.buf.advance(count);
        Ok(())
    }

    /// Reads a NUL-terminated string and consumes the terminator.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn read_cstring(&mut self) -> Result<String, ProtocolError> {
        let Some(end) = self.buf.iter().position(|&b| b == 0) else {
            return Err(ProtocolError::Truncated {
                needed: self.buf.len() + 1,
                remaining: self.buf.len(),
            });
        };
        let text = String::from_utf8_lossy(&self.buf[..end]).into_owned();
        self.buf.advance(end + 1);
        Ok(text)
    }
}

/// Writes `text` followed by a NUL byte.
pub fn put_cstring(buf: &mut impl BufMut, text: &str) {
    buf.put_slice(text.as_bytes());
    buf.put_u8(0);
}

// ---------------------------------------------------------------------------
// LegacyBody
// ---------------------------------------------------------------------------

/// The fixed part of a legacy message.
pub trait LegacyBody: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    fn read(reader: &mut LegacyReader<'_>) -> Result<Self, ProtocolError>;

    fn write(&self, buf: &mut impl BufMut);
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgClientLoggedOff {
    pub result: EResult,
    pub sec_min_reconnect_hint: i32,
    pub sec_max_reconnect_hint: i32,
}

impl LegacyBody for MsgClientLoggedOff {
    const SIZE: usize = 12;

    fn read(r: &mut LegacyReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            result: EResult::from_i32(r.read_i32()?),
            sec_min_reconnect_hint: r.read_i32()?,
            sec_max_reconnect_hint: r.read_i32()?,
        })
    }

    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.result.raw());
        buf.put_i32_le(self.sec_min_reconnect_hint);
        buf.put_i32_le(self.sec_max_reconnect_hint);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgClientJoinChat {
    pub chat_room: SteamId,
    pub is_voice_speaker: bool,
}

impl LegacyBody for MsgClientJoinChat {
    const SIZE: usize = 9;

    fn read(r: &mut LegacyReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            chat_room: r.read_steam_id()?,
            is_voice_speaker: r.read_bool()?,
        })
    }

    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.chat_room.raw());
        buf.put_u8(u8::from(self.is_voice_speaker));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgClientChatEnter {
    pub chat_room: SteamId,
    pub friend: SteamId,
    pub room_type: ChatRoomType,
    pub owner: SteamId,
    pub clan: SteamId,
    pub chat_flags: u8,
    pub enter_response: ChatRoomEnterResponse,
}

impl LegacyBody for MsgClientChatEnter {
    const SIZE: usize = 41;

    fn read(r: &mut LegacyReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            chat_room: r.read_steam_id()?,
            friend: r.read_steam_id()?,
            room_type: ChatRoomType::from_raw(r.read_u32()?),
            owner: r.read_steam_id()?,
            clan: r.read_steam_id()?,
            chat_flags: r.read_u8()?,
            enter_response: ChatRoomEnterResponse::from_raw(r.read_u32()?),
        })
    }

    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.chat_room.raw());
        buf.put_u64_le(self.friend.raw());
        buf.put_u32_le(self.room_type.raw());
        buf.put_u64_le(self.owner.raw());
        buf.put_u64_le(self.clan.raw());
        buf.put_u8(self.chat_flags);
        buf.put_u32_le(self.enter_response.raw());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgClientChatMsg {
    pub chatter: SteamId,
    pub chat_room: SteamId,
    pub entry_type: ChatEntryType,
}

impl LegacyBody for MsgClientChatMsg {
    const SIZE: usize = 20;

    fn read(r: &mut LegacyReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            chatter: r.read_steam_id()?,
            chat_room: r.read_steam_id()?,
            entry_type: ChatEntryType::from_raw(r.read_u32()?),
        })
    }

    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.chatter.raw());
        buf.put_u64_le(self.chat_room.raw());
        buf.put_u32_le(self.entry_type.raw());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgClientChatMemberInfo {
    pub chat_room: SteamId,
    pub info_type: ChatInfoType,
}

impl LegacyBody for MsgClientChatMemberInfo {
    const SIZE: usize = 12;

    fn read(r: &mut LegacyReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            chat_room: r.read_steam_id()?,
            info_type: ChatInfoType::from_raw(r.read_u32()?),
        })
    }

    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.chat_room.raw());
        buf.put_u32_le(self.info_type.raw());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgClientChatAction {
    pub chat_room: SteamId,
    pub target: SteamId,
    pub action: ChatAction,
}

impl LegacyBody for MsgClientChatAction {
    const SIZE: usize = 20;

    fn read(r: &mut LegacyReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            chat_room: r.read_steam_id()?,
            target: r.read_steam_id()?,
            action: ChatAction::from_raw(r.read_u32()?),
        })
    }

    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.chat_room.raw());
        buf.put_u64_le(self.target.raw());
        buf.put_u32_le(self.action.raw());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgClientChatActionResult {
    pub chat_room: SteamId,
    pub target: SteamId,
    pub action: ChatAction,
    pub result: ChatActionResult,
}

impl LegacyBody for MsgClientChatActionResult {
    const SIZE: usize = 24;

    fn read(r: &mut LegacyReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            chat_room: r.read_steam_id()?,
            target: r.read_steam_id()?,
            action: ChatAction::from_raw(r.read_u32()?),
            result: ChatActionResult::from_raw(r.read_u32()?),
        })
    }

    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.chat_room.raw());
        buf.put_u64_le(self.target.raw());
        buf.put_u32_le(self.action.raw());
        buf.put_u32_le(self.result.raw());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgClientSetIgnoreFriend {
    pub my_id: SteamId,
    pub friend: SteamId,
    pub ignore: bool,
}

impl LegacyBody for MsgClientSetIgnoreFriend {
    const SIZE: usize = 17;

    fn read(r: &mut LegacyReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            my_id: r.read_steam_id()?,
            friend: r.read_steam_id()?,
            ignore: r.read_bool()?,
        })
    }

    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.my_id.raw());
        buf.put_u64_le(self.friend.raw());
        buf.put_u8(u8::from(self.ignore));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgClientSetIgnoreFriendResponse {
    pub unknown: u64,
    pub result: EResult,
}

impl LegacyBody for MsgClientSetIgnoreFriendResponse {
    const SIZE: usize = 12;

    fn read(r: &mut LegacyReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            unknown: r.read_u64()?,
            result: EResult::from_i32(r.read_i32()?),
        })
    }

    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.unknown);
        buf.put_u32_le(self.result.raw());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
