//! Decoded message envelopes.
//!
//! [`PacketMsg`] is what the codec produces for every inbound frame and
//! what handlers receive. [`OutboundMsg`] is what handlers build when they
//! want to send something; the client stamps it with the current
//! [`Identity`] when it goes out.

use bytes::Bytes;
use prost::Message;

use crate::enums::EMsg;
use crate::legacy::{LegacyBody, LegacyReader};
use crate::types::{JobId, SteamId};
use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// The header fields shared by both encodings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsgHeader {
    pub steam_id: SteamId,
    pub session_id: i32,
    pub source_job_id: JobId,
    pub target_job_id: JobId,
}

/// Who the client currently is, as stamped on outbound headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity {
    pub steam_id: SteamId,
    pub session_id: i32,
}

// ---------------------------------------------------------------------------
// PacketMsg
// ---------------------------------------------------------------------------

/// One inbound message.
///
/// `payload` is the body only; the header has already been parsed into
/// `header`. Whether the body is protobuf or a legacy struct is given by
/// `is_proto`.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketMsg {
    pub emsg: EMsg,
    pub is_proto: bool,
    pub header: MsgHeader,
    pub payload: Bytes,
}

impl PacketMsg {
    pub fn new(emsg: EMsg, is_proto: bool, header: MsgHeader, payload: impl Into<Bytes>) -> Self {
        Self {
            emsg,
            is_proto,
            header,
            payload: payload.into(),
        }
    }

    /// Builds a protobuf-encoded packet from a message body.
    pub fn from_proto<M: Message>(emsg: EMsg, header: MsgHeader, body: &M) -> Self {
        Self::new(emsg, true, header, body.encode_to_vec())
    }

    /// Builds a legacy packet from a fixed body and trailing payload.
    pub fn from_legacy<B: LegacyBody>(
        emsg: EMsg,
        header: MsgHeader,
        body: &B,
        extra: &[u8],
    ) -> Self {
        let mut buf = Vec::with_capacity(B::SIZE + extra.len());
        body.write(&mut buf);
        buf.extend_from_slice(extra);
        Self::new(emsg, false, header, buf)
    }

    pub fn source_job_id(&self) -> JobId {
        self.header.source_job_id
    }

    pub fn target_job_id(&self) -> JobId {
        self.header.target_job_id
    }

    /// Decodes the body as protobuf message `M`.
    ///
    /// # Errors
    /// `UnexpectedEncoding` if the packet is legacy, `Decode` if the bytes
    /// don't form a valid `M`.
    pub fn read_proto<M: Message + Default>(&self) -> Result<M, ProtocolError> {
        if !self.is_proto {
            return Err(ProtocolError::UnexpectedEncoding { emsg: self.emsg });
        }
        Ok(M::decode(self.payload.clone())?)
    }

    /// Decodes the fixed legacy body `B` and returns it with the bytes
    /// that follow it.
    ///
    /// # Errors
    /// `UnexpectedEncoding` if the packet is protobuf, `Truncated` if the
    /// payload is shorter than `B`.
    pub fn read_legacy<B: LegacyBody>(&self) -> Result<(B, &[u8]), ProtocolError> {
        if self.is_proto {
            return Err(ProtocolError::UnexpectedEncoding { emsg: self.emsg });
        }
        let mut reader = LegacyReader::new(&self.payload);
        let body = B::read(&mut reader)?;
        Ok((body, reader.rest()))
    }
}

// ---------------------------------------------------------------------------
// OutboundMsg
// ---------------------------------------------------------------------------

/// Body of an outbound message, already serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundBody {
    Proto(Bytes),
    Legacy(Bytes),
}

/// A message a handler wants to send.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMsg {
    pub emsg: EMsg,
    pub source_job_id: JobId,
    pub target_job_id: JobId,
    pub body: OutboundBody,
}

impl OutboundMsg {
    pub fn proto<M: Message>(emsg: EMsg, body: &M) -> Self {
        Self {
            emsg,
            source_job_id: JobId::NONE,
            target_job_id: JobId::NONE,
            body: OutboundBody::Proto(body.encode_to_vec().into()),
        }
    }

    pub fn legacy<B: LegacyBody>(emsg: EMsg, body: &B, extra: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(B::SIZE + extra.len());
        body.write(&mut buf);
        buf.extend_from_slice(extra);
        Self {
            emsg,
            source_job_id: JobId::NONE,
            target_job_id: JobId::NONE,
            body: OutboundBody::Legacy(buf.into()),
        }
    }

    /// Marks this message as the reply to the request with job id `job`.
    pub fn in_reply_to(mut self, job: JobId) -> Self {
        self.target_job_id = job;
        self
    }

    pub fn is_proto(&self) -> bool {
        matches!(self.body, OutboundBody::Proto(_))
    }

    /// Views this message as the packet the server would decode.
    pub fn to_packet(&self, identity: Identity) -> PacketMsg {
        let (is_proto, payload) = match &self.body {
            OutboundBody::Proto(bytes) => (true, bytes.clone()),
            OutboundBody::Legacy(bytes) => (false, bytes.clone()),
        };
        PacketMsg {
            emsg: self.emsg,
            is_proto,
            header: MsgHeader {
                steam_id: identity.steam_id,
                session_id: identity.session_id,
                source_job_id: self.source_job_id,
                target_job_id: self.target_job_id,
            },
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::MsgClientJoinChat;
    use crate::messages::CMsgClientNewLoginKeyAccepted;

    #[test]
    fn test_read_proto_on_legacy_packet_is_unexpected_encoding() {
        let packet = PacketMsg::new(EMsg::ClientLogOnResponse, false, MsgHeader::default(), vec![]);
        let err = packet.read_proto::<CMsgClientNewLoginKeyAccepted>().unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedEncoding { .. }));
    }

    #[test]
    fn test_read_legacy_returns_trailing_bytes() {
        let body = MsgClientJoinChat {
            chat_room: SteamId(5),
            is_voice_speaker: false,
        };
        let packet = PacketMsg::from_legacy(EMsg::ClientJoinChat, MsgHeader::default(), &body, b"xy");
        let (decoded, rest) = packet.read_legacy::<MsgClientJoinChat>().unwrap();
        assert_eq!(decoded, body);
        assert_eq!(rest, b"xy");
    }

    #[test]
    fn test_in_reply_to_sets_target_job() {
        let msg = OutboundMsg::proto(EMsg::ClientHeartBeat, &CMsgClientNewLoginKeyAccepted::default())
            .in_reply_to(JobId(77));
        assert_eq!(msg.target_job_id, JobId(77));
        assert!(msg.source_job_id.is_none());
    }

    #[test]
    fn test_to_packet_stamps_identity() {
        let identity = Identity {
            steam_id: SteamId(9),
            session_id: 3,
        };
        let packet = OutboundMsg::proto(EMsg::ClientHeartBeat, &CMsgClientNewLoginKeyAccepted::default())
            .to_packet(identity);
        assert_eq!(packet.header.steam_id, SteamId(9));
        assert_eq!(packet.header.session_id, 3);
        assert!(packet.is_proto);
    }
}
