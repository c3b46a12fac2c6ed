//! Frame codec: raw transport frames to [`PacketMsg`] and back.
//!
//! Every frame starts with a little-endian `u32` message type. The high bit
//! says which header follows:
//!
//! ```text
//! protobuf: u32 emsg|0x8000_0000, u32 header_len, CMsgProtoBufHeader, body
//! legacy:   u32 emsg, u8 36, u16 2, u64 target_job, u64 source_job,
//!           u8 239, u64 steam_id, i32 session_id, body
//! ```
//!
//! A `Multi` frame bundles several frames, optionally gzip-compressed, and
//! is flattened into its parts in order. Bundles do not nest.

use std::io::Read;

use bytes::{BufMut, Bytes};
use flate2::read::GzDecoder;
use prost::Message;

use crate::enums::EMsg;
use crate::envelope::{Identity, MsgHeader, OutboundMsg, PacketMsg};
use crate::legacy::LegacyReader;
use crate::messages::{CMsgMulti, CMsgProtoBufHeader};
use crate::types::{JobId, SteamId};
use crate::ProtocolError;

const PROTO_MASK: u32 = 0x8000_0000;
const EXTENDED_HEADER_SIZE: u8 = 36;
const EXTENDED_HEADER_VERSION: u16 = 2;
const EXTENDED_HEADER_CANARY: u8 = 239;
/// Largest `Multi` body accepted after inflation.
pub const MAX_INFLATED_SIZE: usize = 16 * 1024 * 1024;

/// Converts between transport frames and envelopes.
///
/// The client only talks to this trait, so a different framing (or a test
/// double) can be swapped in without touching dispatch.
pub trait FrameCodec: Send + Sync + 'static {
    /// Decodes one transport frame into one or more packets.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the frame is malformed.
    fn decode_frame(&self, frame: Bytes) -> Result<Vec<PacketMsg>, ProtocolError>;

    /// Encodes an outbound message stamped with `identity`.
    fn encode(&self, msg: &OutboundMsg, identity: Identity) -> Vec<u8>;
}

// ---------------------------------------------------------------------------
// SteamCodec
// ---------------------------------------------------------------------------

/// The codec for the server's native framing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SteamCodec;

impl SteamCodec {
    /// Encodes a packet as the server would send it.
    pub fn encode_packet(packet: &PacketMsg) -> Vec<u8> {
        let h = &packet.header;
        if packet.is_proto {
            let header = CMsgProtoBufHeader {
                steamid: Some(h.steam_id.raw()),
                client_sessionid: Some(h.session_id),
                jobid_source: (!h.source_job_id.is_none()).then_some(h.source_job_id.0),
                jobid_target: (!h.target_job_id.is_none()).then_some(h.target_job_id.0),
                ..Default::default()
            };
            let header = header.encode_to_vec();
            let mut buf = Vec::with_capacity(8 + header.len() + packet.payload.len());
            buf.put_u32_le(packet.emsg.raw() | PROTO_MASK);
            buf.put_u32_le(header.len() as u32);
            buf.extend_from_slice(&header);
            buf.extend_from_slice(&packet.payload);
            buf
        } else {
            let mut buf = Vec::with_capacity(usize::from(EXTENDED_HEADER_SIZE) + packet.payload.len());
            buf.put_u32_le(packet.emsg.raw());
            buf.put_u8(EXTENDED_HEADER_SIZE);
            buf.put_u16_le(EXTENDED_HEADER_VERSION);
            buf.put_u64_le(h.target_job_id.0);
            buf.put_u64_le(h.source_job_id.0);
            buf.put_u8(EXTENDED_HEADER_CANARY);
            buf.put_u64_le(h.steam_id.raw());
            buf.put_i32_le(h.session_id);
            buf.extend_from_slice(&packet.payload);
            buf
        }
    }

    /// Builds a `Multi` frame around already encoded frames.
    ///
    /// With `compress` the bundle is gzip-compressed the way the server
    /// does for large bursts.
    pub fn encode_multi(frames: &[Vec<u8>], compress: bool) -> Result<Vec<u8>, ProtocolError> {
        let mut body = Vec::new();
        for frame in frames {
            body.put_u32_le(frame.len() as u32);
            body.extend_from_slice(frame);
        }
        let size_unzipped = body.len() as u32;
        let multi = if compress {
            use std::io::Write;
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&body)?;
            CMsgMulti {
                size_unzipped: Some(size_unzipped),
                message_body: Some(encoder.finish()?),
            }
        } else {
            CMsgMulti {
                size_unzipped: Some(0),
                message_body: Some(body),
            }
        };
        Ok(Self::encode_packet(&PacketMsg::from_proto(
            EMsg::Multi,
            MsgHeader::default(),
            &multi,
        )))
    }

    fn decode_one(frame: Bytes) -> Result<PacketMsg, ProtocolError> {
        let mut r = LegacyReader::new(&frame);
        let raw = r.read_u32()?;
        let emsg = EMsg::from_raw(raw & !PROTO_MASK);

        let (is_proto, header) = if raw & PROTO_MASK != 0 {
            let len = r.read_u32()? as usize;
            let start = frame.len() - r.remaining();
            r.skip(len)?;
            let proto = CMsgProtoBufHeader::decode(&frame[start..start + len])?;
            let header = MsgHeader {
                steam_id: SteamId(proto.steamid.unwrap_or_default()),
                session_id: proto.client_sessionid.unwrap_or_default(),
                source_job_id: proto.jobid_source.map_or(JobId::NONE, JobId),
                target_job_id: proto.jobid_target.map_or(JobId::NONE, JobId),
            };
            (true, header)
        } else {
            let size = r.read_u8()?;
            if size != EXTENDED_HEADER_SIZE {
                return Err(ProtocolError::InvalidMessage(format!(
                    "{emsg}: header size {size}, expected {EXTENDED_HEADER_SIZE}"
                )));
            }
            let _version = r.read_u16()?;
            let target_job_id = JobId(r.read_u64()?);
            let source_job_id = JobId(r.read_u64()?);
            let canary = r.read_u8()?;
            if canary != EXTENDED_HEADER_CANARY {
                return Err(ProtocolError::InvalidMessage(format!(
                    "{emsg}: bad header canary {canary}"
                )));
            }
            let header = MsgHeader {
                steam_id: r.read_steam_id()?,
                session_id: r.read_i32()?,
                source_job_id,
                target_job_id,
            };
            (false, header)
        };

        let offset = frame.len() - r.remaining();
        Ok(PacketMsg {
            emsg,
            is_proto,
            header,
            payload: frame.slice(offset..),
        })
    }

    fn expand_multi(packet: &PacketMsg, out: &mut Vec<PacketMsg>) -> Result<(), ProtocolError> {
        let multi: CMsgMulti = packet.read_proto()?;
        let body = multi.message_body.unwrap_or_default();
        let body = match multi.size_unzipped.unwrap_or(0) as usize {
            0 => body,
            size if size > MAX_INFLATED_SIZE => {
                return Err(ProtocolError::InvalidMessage(format!(
                    "multi claims {size} bytes unzipped, limit is {MAX_INFLATED_SIZE}"
                )));
            }
            size => {
                let mut inflated = Vec::with_capacity(size);
                GzDecoder::new(body.as_slice())
                    .take(size as u64 + 1)
                    .read_to_end(&mut inflated)?;
                if inflated.len() > size {
                    return Err(ProtocolError::InvalidMessage(format!(
                        "multi inflates past its declared {size} bytes"
                    )));
                }
                inflated
            }
        };

        let body = Bytes::from(body);
        let mut r = LegacyReader::new(&body);
        while r.remaining() > 0 {
            let len = r.read_u32()? as usize;
            let start = body.len() - r.remaining();
            r.skip(len)?;
            let inner = Self::decode_one(body.slice(start..start + len))?;
            if inner.emsg == EMsg::Multi {
                return Err(ProtocolError::InvalidMessage("nested multi".into()));
            }
            out.push(inner);
        }
        Ok(())
    }

    fn decode_into(frame: Bytes, out: &mut Vec<PacketMsg>) -> Result<(), ProtocolError> {
        let packet = Self::decode_one(frame)?;
        if packet.emsg == EMsg::Multi {
            Self::expand_multi(&packet, out)
        } else {
            out.push(packet);
            Ok(())
        }
    }
}

impl FrameCodec for SteamCodec {
    fn decode_frame(&self, frame: Bytes) -> Result<Vec<PacketMsg>, ProtocolError> {
        let mut out = Vec::with_capacity(1);
        Self::decode_into(frame, &mut out)?;
        Ok(out)
    }

    fn encode(&self, msg: &OutboundMsg, identity: Identity) -> Vec<u8> {
        Self::encode_packet(&msg.to_packet(identity))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::{LegacyBody, MsgClientChatMsg};
    use crate::messages::CMsgClientNewLoginKey;
    use crate::ChatEntryType;

    fn header() -> MsgHeader {
        MsgHeader {
            steam_id: SteamId(76561197960278073),
            session_id: 42,
            source_job_id: JobId(1234),
            target_job_id: JobId::NONE,
        }
    }

    fn login_key_packet(id: u32) -> PacketMsg {
        PacketMsg::from_proto(
            EMsg::ClientNewLoginKey,
            header(),
            &CMsgClientNewLoginKey {
                unique_id: Some(id),
                login_key: Some("key".into()),
            },
        )
    }

    // =====================================================================
    // Single frames
    // =====================================================================

    #[test]
    fn test_decode_frame_proto_restores_header_and_body() {
        let packet = login_key_packet(7);
        let frame = SteamCodec::encode_packet(&packet);

        let decoded = SteamCodec.decode_frame(frame.into()).unwrap();
        assert_eq!(decoded, vec![packet]);
    }

    #[test]
    fn test_decode_frame_legacy_restores_header_and_body() {
        let body = MsgClientChatMsg {
            chatter: SteamId(1),
            chat_room: SteamId(2),
            entry_type: ChatEntryType::ChatMsg,
        };
        let packet = PacketMsg::from_legacy(EMsg::ClientChatMsg, header(), &body, b"hi\0");
        let frame = SteamCodec::encode_packet(&packet);
        assert_eq!(frame.len(), 36 + MsgClientChatMsg::SIZE + 3);

        let decoded = SteamCodec.decode_frame(frame.into()).unwrap();
        assert_eq!(decoded, vec![packet]);
    }

    #[test]
    fn test_decode_frame_bad_canary_is_invalid() {
        let packet = PacketMsg::new(EMsg::ClientChatMsg, false, header(), vec![]);
        let mut frame = SteamCodec::encode_packet(&packet);
        frame[23] = 0;
        assert!(matches!(
            SteamCodec.decode_frame(frame.into()),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_decode_frame_header_length_past_end_is_truncated() {
        let mut frame = Vec::new();
        frame.put_u32_le(EMsg::ClientLogOnResponse.raw() | PROTO_MASK);
        frame.put_u32_le(100);
        frame.extend_from_slice(&[0; 10]);
        assert!(matches!(
            SteamCodec.decode_frame(frame.into()),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn test_encode_stamps_identity_and_reply_job() {
        let msg = OutboundMsg::proto(EMsg::ClientNewLoginKeyAccepted, &CMsgClientNewLoginKey::default())
            .in_reply_to(JobId(99));
        let identity = Identity {
            steam_id: SteamId(5),
            session_id: 6,
        };
        let frame = SteamCodec.encode(&msg, identity);
        let decoded = SteamCodec.decode_frame(frame.into()).unwrap().remove(0);
        assert_eq!(decoded.header.steam_id, SteamId(5));
        assert_eq!(decoded.header.session_id, 6);
        assert_eq!(decoded.target_job_id(), JobId(99));
        assert!(decoded.source_job_id().is_none());
    }

    // =====================================================================
    // Multi
    // =====================================================================

    #[test]
    fn test_decode_frame_multi_preserves_order() {
        let frames: Vec<_> = (0..3).map(|i| SteamCodec::encode_packet(&login_key_packet(i))).collect();
        let multi = SteamCodec::encode_multi(&frames, false).unwrap();

        let decoded = SteamCodec.decode_frame(multi.into()).unwrap();
        let ids: Vec<_> = decoded
            .iter()
            .map(|p| p.read_proto::<CMsgClientNewLoginKey>().unwrap().unique_id)
            .collect();
        assert_eq!(ids, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn test_decode_frame_gzip_multi_is_inflated() {
        let frames: Vec<_> = (0..5).map(|i| SteamCodec::encode_packet(&login_key_packet(i))).collect();
        let multi = SteamCodec::encode_multi(&frames, true).unwrap();

        let decoded = SteamCodec.decode_frame(multi.into()).unwrap();
        assert_eq!(decoded.len(), 5);
        assert_eq!(decoded[4], login_key_packet(4));
    }

    #[test]
    fn test_decode_frame_nested_multi_is_invalid() {
        let inner = SteamCodec::encode_multi(&[SteamCodec::encode_packet(&login_key_packet(1))], false).unwrap();
        let outer = SteamCodec::encode_multi(&[inner], false).unwrap();

        assert!(matches!(
            SteamCodec.decode_frame(outer.into()),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    fn gzip_multi(body: &[u8], size_unzipped: u32) -> Vec<u8> {
        use std::io::Write;
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(body).unwrap();
        let multi = CMsgMulti {
            size_unzipped: Some(size_unzipped),
            message_body: Some(encoder.finish().unwrap()),
        };
        SteamCodec::encode_packet(&PacketMsg::from_proto(EMsg::Multi, MsgHeader::default(), &multi))
    }

    #[test]
    fn test_decode_frame_multi_over_size_limit_is_invalid() {
        let frame = gzip_multi(&[0; 16], MAX_INFLATED_SIZE as u32 + 1);
        assert!(matches!(
            SteamCodec.decode_frame(frame.into()),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_decode_frame_multi_inflating_past_declared_size_is_invalid() {
        // 64 KiB of zeros compresses to a few hundred bytes.
        let frame = gzip_multi(&vec![0; 64 * 1024], 1024);
        assert!(matches!(
            SteamCodec.decode_frame(frame.into()),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }
}
