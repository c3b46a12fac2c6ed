//! Positional decoder for the binary sub-records inside chat messages.
//!
//! Two legacy messages carry member data that isn't protobuf: the payload
//! that follows a chat-room enter response, and the payload of a member
//! "entered" state change. Both embed the same *member record*:
//!
//! ```text
//! "MessageObject\0"  u8 type tag
//! "steamid\0"        u64 member id       u8 type tag
//! "Permissions\0"    u32 permission bits u8 type tag
//! "Details\0"        u32 rank
//! ```
//!
//! The labels are read and discarded; only positions matter. Anything
//! shorter than expected fails with [`ProtocolError::Truncated`], and the
//! caller drops the whole message.

use bytes::BufMut;

use crate::enums::{ChatMemberStateChange, ClanRank};
use crate::legacy::{put_cstring, LegacyReader};
use crate::types::{ChatPermissions, SteamId};
use crate::ProtocolError;

/// Unused bytes after every member record in an enter payload.
const ENTER_MEMBER_TRAILER: usize = 6;

/// A decoded member record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatMemberRecord {
    pub steam_id: SteamId,
    pub permissions: ChatPermissions,
    pub rank: ClanRank,
}

/// Reads one member record.
pub fn read_member_record(
    r: &mut LegacyReader<'_>,
) -> Result<ChatMemberRecord, ProtocolError> {
    r.read_cstring()?; // MessageObject
    r.read_u8()?;
    r.read_cstring()?; // steamid
    let steam_id = r.read_steam_id()?;
    r.read_u8()?;
    r.read_cstring()?; // Permissions
    let permissions = ChatPermissions(r.read_u32()?);
    r.read_u8()?;
    r.read_cstring()?; // Details
    let rank = ClanRank::from_member_record(r.read_u32()?);
    Ok(ChatMemberRecord {
        steam_id,
        permissions,
        rank,
    })
}

/// Writes one member record with `raw_rank` stored verbatim.
pub fn write_member_record(
    buf: &mut impl BufMut,
    steam_id: SteamId,
    permissions: ChatPermissions,
    raw_rank: u32,
) {
    put_cstring(buf, "MessageObject");
    buf.put_u8(7);
    put_cstring(buf, "steamid");
    buf.put_u64_le(steam_id.raw());
    buf.put_u8(2);
    put_cstring(buf, "Permissions");
    buf.put_u32_le(permissions.bits());
    buf.put_u8(2);
    put_cstring(buf, "Details");
    buf.put_u32_le(raw_rank);
}

// ---------------------------------------------------------------------------
// Chat room enter
// ---------------------------------------------------------------------------

/// Payload following a chat-room enter response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRoomEnterPayload {
    pub name: String,
    pub members: Vec<ChatMemberRecord>,
}

/// Decodes `u32 count, name, filler byte, count × (record, 6 bytes)`.
pub fn decode_chat_enter_payload(
    payload: &[u8],
) -> Result<ChatRoomEnterPayload, ProtocolError> {
    let mut r = LegacyReader::new(payload);
    let count = r.read_u32()?;
    let name = r.read_cstring()?;
    r.read_u8()?;

    // Each record is at least 40 bytes; don't trust the count for capacity.
    let mut members = Vec::with_capacity((count as usize).min(r.remaining() / 40));
    for _ in 0..count {
        members.push(read_member_record(&mut r)?);
        r.skip(ENTER_MEMBER_TRAILER)?;
    }
    Ok(ChatRoomEnterPayload { name, members })
}

// ---------------------------------------------------------------------------
// Member state change
// ---------------------------------------------------------------------------

/// Payload of a chat member info message of type `StateChange`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberStateChange {
    pub acted_on: SteamId,
    pub change: ChatMemberStateChange,
    pub acted_by: SteamId,
    /// Present only when `change` is `Entered`.
    pub member: Option<ChatMemberRecord>,
}

/// Decodes `u64 acted_on, u32 change, u64 acted_by, filler byte` and, for
/// an `Entered` change, the member record that follows.
pub fn decode_member_state_change(
    payload: &[u8],
) -> Result<MemberStateChange, ProtocolError> {
    let mut r = LegacyReader::new(payload);
    let acted_on = r.read_steam_id()?;
    let change = ChatMemberStateChange::from_raw(r.read_u32()?);
    let acted_by = r.read_steam_id()?;
    r.read_u8()?;
    let member = if change == ChatMemberStateChange::Entered {
        Some(read_member_record(&mut r)?)
    } else {
        None
    };
    Ok(MemberStateChange {
        acted_on,
        change,
        acted_by,
        member,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, rank: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        write_member_record(&mut buf, SteamId(id), ChatPermissions(0x1a), rank);
        buf
    }

    fn decode_one(bytes: &[u8]) -> Result<ChatMemberRecord, ProtocolError> {
        read_member_record(&mut LegacyReader::new(bytes))
    }

    // =====================================================================
    // Member record
    // =====================================================================

    #[test]
    fn test_read_member_record_rank_4_is_member() {
        let decoded = decode_one(&record(99, 4)).unwrap();
        assert_eq!(decoded.steam_id, SteamId(99));
        assert_eq!(decoded.permissions, ChatPermissions(0x1a));
        assert_eq!(decoded.rank, ClanRank::Member);
    }

    #[test]
    fn test_read_member_record_rank_8_is_moderator() {
        assert_eq!(decode_one(&record(99, 8)).unwrap().rank, ClanRank::Moderator);
    }

    #[test]
    fn test_read_member_record_unknown_rank_passes_through() {
        assert_eq!(decode_one(&record(99, 21)).unwrap().rank, ClanRank::Other(21));
    }

    #[test]
    fn test_read_member_record_short_payload_fails() {
        let bytes = record(99, 4);
        for cut in [0, 10, 30, bytes.len() - 1] {
            assert!(
                matches!(decode_one(&bytes[..cut]), Err(ProtocolError::Truncated { .. })),
                "cut at {cut} should be truncated"
            );
        }
    }

    // =====================================================================
    // Enter payload
    // =====================================================================

    fn enter_payload(name: &str, ids: &[u64]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.put_u32_le(ids.len() as u32);
        put_cstring(&mut buf, name);
        buf.put_u8(0);
        for &id in ids {
            buf.extend_from_slice(&record(id, 4));
            buf.extend_from_slice(&[0xAA; ENTER_MEMBER_TRAILER]);
        }
        buf
    }

    #[test]
    fn test_decode_chat_enter_payload_reads_all_members() {
        let payload = decode_chat_enter_payload(&enter_payload("Lounge", &[1, 2, 3])).unwrap();
        assert_eq!(payload.name, "Lounge");
        let ids: Vec<_> = payload.members.iter().map(|m| m.steam_id).collect();
        assert_eq!(ids, vec![SteamId(1), SteamId(2), SteamId(3)]);
    }

    #[test]
    fn test_decode_chat_enter_payload_missing_trailer_fails() {
        let mut bytes = enter_payload("Lounge", &[1]);
        bytes.truncate(bytes.len() - 2);
        assert!(decode_chat_enter_payload(&bytes).is_err());
    }

    #[test]
    fn test_decode_chat_enter_payload_count_larger_than_data_fails() {
        let mut bytes = enter_payload("Lounge", &[1]);
        bytes[0] = 5;
        assert!(decode_chat_enter_payload(&bytes).is_err());
    }

    // =====================================================================
    // State change payload
    // =====================================================================

    #[test]
    fn test_decode_member_state_change_entered_has_record() {
        let mut buf = Vec::new();
        buf.put_u64_le(10);
        buf.put_u32_le(ChatMemberStateChange::Entered.raw());
        buf.put_u64_le(10);
        buf.put_u8(0);
        buf.extend_from_slice(&record(10, 8));

        let change = decode_member_state_change(&buf).unwrap();
        assert_eq!(change.acted_on, SteamId(10));
        assert_eq!(change.member.map(|m| m.rank), Some(ClanRank::Moderator));
    }

    #[test]
    fn test_decode_member_state_change_left_has_no_record() {
        let mut buf = Vec::new();
        buf.put_u64_le(10);
        buf.put_u32_le(ChatMemberStateChange::Left.raw());
        buf.put_u64_le(11);
        buf.put_u8(0);

        let change = decode_member_state_change(&buf).unwrap();
        assert_eq!(change.change, ChatMemberStateChange::Left);
        assert_eq!(change.acted_by, SteamId(11));
        assert!(change.member.is_none());
    }
}
