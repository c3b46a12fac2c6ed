//! End-to-end tests for `Client::run` over an in-memory connection.
//!
//! The test plays the server: it reads the frames the client writes,
//! decodes them with the same codec, and pushes encoded server frames back.

use bytes::Bytes;
use cinder::prelude::*;
use cinder_protocol::legacy::{MsgClientChatEnter, MsgClientChatMsg, MsgClientLoggedOff};
use cinder_protocol::messages::{
    cmsg_client_friends_list, CMsgClientFriendsList, CMsgClientLogonResponse,
};
use cinder_protocol::{
    ChatRoomEnterResponse, ChatRoomType, HandlerError, JobId, MsgHeader, ProtocolError,
};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{mpsc, Mutex};

// =========================================================================
// In-memory connection
// =========================================================================

struct MemoryConnection {
    id: ConnectionId,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl Connection for MemoryConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        self.outbound
            .send(data.to_vec())
            .map_err(|_| TransportError::ConnectionClosed("peer gone".into()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.inbound.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// The server end. Dropping it closes the connection.
struct Peer {
    to_client: mpsc::UnboundedSender<Vec<u8>>,
    from_client: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Peer {
    fn push(&self, packet: &PacketMsg) {
        self.push_raw(SteamCodec::encode_packet(packet));
    }

    fn push_raw(&self, frame: Vec<u8>) {
        self.to_client.send(frame).unwrap();
    }

    /// Next packet the client wrote.
    async fn next(&mut self) -> PacketMsg {
        let frame = self.from_client.recv().await.expect("client closed");
        let mut packets = SteamCodec.decode_frame(Bytes::from(frame)).unwrap();
        assert_eq!(packets.len(), 1);
        packets.remove(0)
    }
}

/// A connection whose writes never complete.
struct StalledWriter {
    inner: MemoryConnection,
}

impl Connection for StalledWriter {
    type Error = TransportError;

    async fn send(&self, _data: &[u8]) -> Result<(), TransportError> {
        std::future::pending::<Result<(), TransportError>>().await
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        self.inner.recv().await
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.inner.id
    }
}

fn pair() -> (MemoryConnection, Peer) {
    let (to_client, inbound) = mpsc::unbounded_channel();
    let (outbound, from_client) = mpsc::unbounded_channel();
    let conn = MemoryConnection {
        id: ConnectionId::next(),
        inbound: Mutex::new(inbound),
        outbound,
    };
    (
        conn,
        Peer {
            to_client,
            from_client,
        },
    )
}

// =========================================================================
// Helpers
// =========================================================================

const ME: SteamId = SteamId(76561197960278073);
const BOB: SteamId = SteamId(76561197960287930);

fn header() -> MsgHeader {
    MsgHeader {
        steam_id: ME,
        session_id: 77,
        source_job_id: JobId::NONE,
        target_job_id: JobId::NONE,
    }
}

fn logon_response(result: EResult) -> PacketMsg {
    PacketMsg::from_proto(
        EMsg::ClientLogOnResponse,
        header(),
        &CMsgClientLogonResponse {
            eresult: Some(result.raw() as i32),
            out_of_game_heartbeat_seconds: Some(9),
            ..Default::default()
        },
    )
}

fn friends_list() -> PacketMsg {
    PacketMsg::from_proto(
        EMsg::ClientFriendsList,
        header(),
        &CMsgClientFriendsList {
            bincremental: Some(false),
            friends: vec![cmsg_client_friends_list::Friend {
                ulfriendid: Some(BOB.raw()),
                efriendrelationship: Some(3),
            }],
        },
    )
}

fn chat_msg(text: &[u8]) -> PacketMsg {
    PacketMsg::from_legacy(
        EMsg::ClientChatMsg,
        header(),
        &MsgClientChatMsg {
            chatter: BOB,
            chat_room: SteamId(110338190870577152),
            entry_type: ChatEntryType::ChatMsg,
        },
        text,
    )
}

fn drain(events: &mut EventReceiver) -> Vec<Event> {
    let mut out = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => out.push(event),
            Err(TryRecvError::Empty) => return out,
            Err(e) => panic!("event receiver failed: {e}"),
        }
    }
}

fn details() -> LogOnDetails {
    LogOnDetails::new("me", "hunter2")
}

// =========================================================================
// Session lifecycle
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_run_logs_on_heartbeats_and_caches_friends() {
    let client = Client::builder().build();
    let mut events = client.subscribe();
    let (conn, mut peer) = pair();
    client.log_on(&details()).unwrap();

    let server = async move {
        let logon = peer.next().await;
        assert_eq!(logon.emsg, EMsg::ClientLogon);
        assert_eq!(logon.header.steam_id, SteamId::logon_placeholder());

        peer.push(&logon_response(EResult::Ok));
        peer.push(&friends_list());

        // Paused time jumps straight to the first beat.
        let beat = peer.next().await;
        assert_eq!(beat.emsg, EMsg::ClientHeartBeat);
        assert_eq!(beat.header.steam_id, ME);
        assert_eq!(beat.header.session_id, 77);
    };

    let (result, ()) = tokio::join!(client.run(conn), server);
    result.unwrap();

    assert!(client.social().friends().contains(BOB));
    assert_eq!(client.session().state(), SessionState::Disconnected);
    assert!(!client.auth().heartbeat_running());

    let events = drain(&mut events);
    assert!(matches!(events[0], Event::LoggedOn(_)));
    assert_eq!(events[1], Event::FriendsListLoaded);
    assert_eq!(events.last(), Some(&Event::Disconnected));
}

#[tokio::test]
async fn test_logon_rejected_ends_run_with_result() {
    let client = Client::builder().build();
    let mut events = client.subscribe();
    let (conn, mut peer) = pair();
    client.log_on(&details()).unwrap();

    let server = async move {
        peer.next().await;
        peer.push(&logon_response(EResult::InvalidPassword));
        // Keep the peer alive until the client hangs up.
        while peer.from_client.recv().await.is_some() {}
    };

    let (result, ()) = tokio::join!(client.run(conn), server);
    let err = result.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Handler(HandlerError::LogOnRejected(EResult::InvalidPassword))
    ));
    assert_eq!(
        drain(&mut events),
        vec![
            Event::LogOnFailed {
                result: EResult::InvalidPassword
            },
            Event::Disconnected,
        ]
    );
}

#[tokio::test]
async fn test_transient_logon_result_waits_for_disconnect() {
    let client = Client::builder().build();
    let mut events = client.subscribe();
    let (conn, mut peer) = pair();
    client.log_on(&details()).unwrap();

    let server = async move {
        peer.next().await;
        peer.push(&logon_response(EResult::TryAnotherCM));
    };

    let (result, ()) = tokio::join!(client.run(conn), server);
    result.unwrap();
    assert_eq!(drain(&mut events), vec![Event::Disconnected]);
}

#[tokio::test]
async fn test_stalled_write_does_not_block_dispatch() {
    let client = Client::builder().build();
    let mut events = client.subscribe();
    let (conn, peer) = pair();
    client.log_on(&details()).unwrap();

    let server = async move {
        peer.push(&friends_list());
        loop {
            match events.recv().await.unwrap() {
                Event::FriendsListLoaded => break,
                other => panic!("unexpected event {other:?}"),
            }
        }
        drop(peer);
    };

    let (result, ()) = tokio::join!(client.run(StalledWriter { inner: conn }), server);
    result.unwrap();
    assert!(client.social().friends().contains(BOB));
}

#[tokio::test]
async fn test_run_again_after_disconnect() {
    let client = Client::builder().build();

    let (conn, mut peer) = pair();
    client.log_on(&details()).unwrap();
    let server = async move {
        peer.next().await;
        peer.push(&PacketMsg::from_legacy(
            EMsg::ClientLoggedOff,
            header(),
            &MsgClientLoggedOff {
                result: EResult::LoggedInElsewhere,
                sec_min_reconnect_hint: 0,
                sec_max_reconnect_hint: 0,
            },
            &[],
        ));
    };
    let (result, ()) = tokio::join!(client.run(conn), server);
    result.unwrap();

    let (conn, mut peer) = pair();
    client.log_on(&details()).unwrap();
    let server = async move {
        assert_eq!(peer.next().await.emsg, EMsg::ClientLogon);
    };
    let (result, ()) = tokio::join!(client.run(conn), server);
    result.unwrap();
}

#[tokio::test]
async fn test_concurrent_run_is_already_running() {
    let client = Client::builder().build();
    let client = &client;
    let (first_conn, first_peer) = pair();
    let (second_conn, _second_peer) = pair();

    let (first, second) = tokio::join!(client.run(first_conn), async move {
        let result = client.run(second_conn).await;
        drop(first_peer);
        result
    });

    first.unwrap();
    assert!(matches!(second, Err(ClientError::AlreadyRunning)));
}

// =========================================================================
// Dispatch through the loop
// =========================================================================

#[tokio::test]
async fn test_unknown_and_malformed_messages_do_not_stop_the_loop() {
    let client = Client::builder().build();
    let mut events = client.subscribe();
    let (conn, peer) = pair();

    peer.push(&PacketMsg::new(EMsg::Other(9999), true, header(), vec![1, 2, 3]));
    let truncated_enter = MsgClientChatEnter {
        chat_room: SteamId(110338190870577152),
        friend: SteamId(0),
        room_type: ChatRoomType::MUC,
        owner: BOB,
        clan: SteamId(0),
        chat_flags: 0,
        enter_response: ChatRoomEnterResponse::Success,
    };
    peer.push(&PacketMsg::from_legacy(
        EMsg::ClientChatEnter,
        header(),
        &truncated_enter,
        &[2, 0, 0, 0],
    ));
    peer.push(&chat_msg(b"still here\0"));
    drop(peer);

    client.run(conn).await.unwrap();

    let events = drain(&mut events);
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        Event::ChatMessage { message, .. } if message == "still here"
    ));
    assert_eq!(events[1], Event::Disconnected);
}

#[tokio::test]
async fn test_multi_frame_is_dispatched_in_order() {
    let client = Client::builder().build();
    let mut events = client.subscribe();
    let (conn, peer) = pair();

    let frames = vec![
        SteamCodec::encode_packet(&chat_msg(b"one\0")),
        SteamCodec::encode_packet(&chat_msg(b"two\0")),
        SteamCodec::encode_packet(&chat_msg(b"three\0")),
    ];
    peer.push_raw(SteamCodec::encode_multi(&frames, true).unwrap());
    drop(peer);

    client.run(conn).await.unwrap();

    let texts: Vec<String> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            Event::ChatMessage { message, .. } => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn test_undecodable_frame_is_protocol_error() {
    let client = Client::builder().build();
    let mut events = client.subscribe();
    let (conn, peer) = pair();
    peer.push_raw(vec![1, 2]);

    let err = client.run(conn).await.unwrap_err();
    drop(peer);

    assert!(matches!(err, ClientError::Protocol(ProtocolError::Truncated { .. })));
    assert_eq!(drain(&mut events), vec![Event::Disconnected]);
}

#[tokio::test]
async fn test_legacy_logon_response_is_protocol_violation() {
    let client = Client::builder().build();
    let (conn, peer) = pair();
    client.log_on(&details()).unwrap();
    peer.push(&PacketMsg::new(
        EMsg::ClientLogOnResponse,
        false,
        header(),
        vec![1, 0, 0, 0],
    ));

    let err = client.run(conn).await.unwrap_err();
    drop(peer);

    assert!(matches!(
        err,
        ClientError::Handler(HandlerError::ProtocolViolation(_))
    ));
    assert_eq!(client.session().state(), SessionState::Disconnected);
}
