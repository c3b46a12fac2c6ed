//! Integration tests for the logon state machine.
//!
//! Packets are built with the protocol crate's constructors and fed to
//! `Auth::handle_packet` directly; outbound messages are read back from the
//! outbox receiver.

use std::sync::Arc;
use std::time::Duration;

use cinder_protocol::legacy::MsgClientLoggedOff;
use cinder_protocol::messages::{
    CMsgClientAccountInfo, CMsgClientLoggedOff, CMsgClientLogon, CMsgClientLogonResponse,
    CMsgClientNewLoginKey, CMsgClientNewLoginKeyAccepted, CMsgClientUpdateMachineAuth,
    CMsgClientUpdateMachineAuthResponse,
};
use cinder_protocol::{
    EMsg, EResult, Event, EventBus, EventReceiver, HandlerError, Identity, JobId, MsgHeader,
    OutboundMsg, OutboundReceiver, Outbox, PacketHandler, PacketMsg, ProtocolError, SteamId,
};
use cinder_session::{Auth, AuthConfig, LogOnDetails, Session, SessionError, SessionState};
use tokio::sync::broadcast::error::TryRecvError;

// =========================================================================
// Helpers
// =========================================================================

const ALICE: SteamId = SteamId(76561197960278073);

struct Harness {
    auth: Auth,
    outbound: OutboundReceiver,
    events: EventReceiver,
}

fn harness() -> Harness {
    let (outbox, outbound) = Outbox::channel();
    let bus = EventBus::default();
    let events = bus.subscribe();
    let auth = Auth::new(Arc::new(Session::new()), outbox, bus, AuthConfig::default());
    Harness {
        auth,
        outbound,
        events,
    }
}

impl Harness {
    fn sent(&mut self) -> Vec<OutboundMsg> {
        let mut out = Vec::new();
        while let Ok(msg) = self.outbound.try_recv() {
            out.push(msg);
        }
        out
    }

    fn published(&mut self) -> Vec<Event> {
        let mut out = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => out.push(event),
                Err(TryRecvError::Empty) => return out,
                Err(e) => panic!("event receiver failed: {e}"),
            }
        }
    }

    fn session(&self) -> &Session {
        self.auth.session()
    }
}

fn server_header(job: JobId) -> MsgHeader {
    MsgHeader {
        steam_id: ALICE,
        session_id: 4242,
        source_job_id: job,
        target_job_id: JobId::NONE,
    }
}

fn logon_response(result: EResult, heartbeat_secs: i32) -> PacketMsg {
    PacketMsg::from_proto(
        EMsg::ClientLogOnResponse,
        server_header(JobId::NONE),
        &CMsgClientLogonResponse {
            eresult: Some(result.raw() as i32),
            out_of_game_heartbeat_seconds: Some(heartbeat_secs),
            public_ip: Some(0x7f00_0001),
            rtime32_server_time: Some(1_700_000_000),
            email_domain: Some("example.com".into()),
            vanity_url: Some("alice".into()),
            cell_id: Some(25),
            count_loginfailures_to_migrate: Some(3),
            count_disconnects_to_migrate: Some(4),
            ..Default::default()
        },
    )
}

fn details() -> LogOnDetails {
    LogOnDetails::new("alice", "hunter2")
}

// =========================================================================
// log_on
// =========================================================================

#[test]
fn test_log_on_sends_exactly_one_logon() {
    let mut h = harness();
    h.auth.log_on(&details().with_two_factor_code("XY12Z")).unwrap();

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].emsg, EMsg::ClientLogon);

    let body: CMsgClientLogon = sent[0].to_packet(Identity::default()).read_proto().unwrap();
    assert_eq!(body.account_name.as_deref(), Some("alice"));
    assert_eq!(body.password.as_deref(), Some("hunter2"));
    assert_eq!(body.two_factor_code.as_deref(), Some("XY12Z"));
    assert_eq!(body.protocol_version, Some(cinder_protocol::PROTOCOL_VERSION));
    assert_eq!(body.sha_sentryfile, None);
    assert_eq!(body.eresult_sentryfile, Some(EResult::FileNotFound.raw() as i32));
}

#[test]
fn test_log_on_does_not_establish_session() {
    let mut h = harness();
    h.auth.log_on(&details()).unwrap();

    assert_eq!(h.session().state(), SessionState::LoggingOn);
    assert_eq!(h.session().steam_id(), SteamId::logon_placeholder());
    assert_eq!(h.session().session_id(), 0);
    assert!(!h.auth.heartbeat_running());
    assert!(h.published().is_empty());
}

#[test]
fn test_log_on_carries_sentry_hash() {
    let mut h = harness();
    h.auth.log_on(&details().with_sentry_hash([9u8; 20])).unwrap();

    let body: CMsgClientLogon = h.sent()[0].to_packet(Identity::default()).read_proto().unwrap();
    assert_eq!(body.sha_sentryfile, Some(vec![9u8; 20]));
    assert_eq!(body.eresult_sentryfile, Some(1));
}

#[test]
fn test_log_on_empty_username_sends_nothing() {
    let mut h = harness();
    let err = h.auth.log_on(&LogOnDetails::new("", "hunter2")).unwrap_err();

    assert!(matches!(err, SessionError::InvalidArgument(_)));
    assert!(h.sent().is_empty());
    assert_eq!(h.session().state(), SessionState::Disconnected);
}

#[test]
fn test_log_on_empty_password_sends_nothing() {
    let mut h = harness();
    let err = h.auth.log_on(&LogOnDetails::new("alice", "")).unwrap_err();

    assert!(matches!(err, SessionError::InvalidArgument(_)));
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn test_log_on_while_logged_on_is_invalid_state() {
    let mut h = harness();
    h.auth.log_on(&details()).unwrap();
    h.auth.handle_packet(&logon_response(EResult::Ok, 9)).unwrap();
    h.sent();

    let err = h.auth.log_on(&details()).unwrap_err();
    assert!(matches!(err, SessionError::InvalidState(SessionState::LoggedOn)));
    assert!(h.sent().is_empty());
}

// =========================================================================
// Logon response
// =========================================================================

#[tokio::test]
async fn test_logon_response_ok_establishes_session() {
    let mut h = harness();
    h.auth.log_on(&details()).unwrap();
    h.auth.handle_packet(&logon_response(EResult::Ok, 9)).unwrap();

    assert_eq!(h.session().state(), SessionState::LoggedOn);
    assert_eq!(h.session().steam_id(), ALICE);
    assert_eq!(h.session().session_id(), 4242);
    assert_eq!(h.session().heartbeat_interval(), Some(Duration::from_secs(9)));
    assert!(h.auth.heartbeat_running());

    let events = h.published();
    assert_eq!(events.len(), 1);
    let Event::LoggedOn(info) = &events[0] else {
        panic!("expected LoggedOn, got {:?}", events[0]);
    };
    assert_eq!(info.steam_id, ALICE);
    assert_eq!(info.session_id, 4242);
    assert_eq!(info.public_ip, Some(std::net::Ipv4Addr::new(127, 0, 0, 1)));
    assert_eq!(info.server_time, 1_700_000_000);
    assert_eq!(info.email_domain.as_deref(), Some("example.com"));
    assert_eq!(info.vanity_url.as_deref(), Some("alice"));
    assert_eq!(info.cell_id, 25);
    assert_eq!(info.count_login_failures_to_migrate, 3);
    assert_eq!(info.count_disconnects_to_migrate, 4);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_sends_at_server_interval() {
    let mut h = harness();
    h.auth.log_on(&details()).unwrap();
    h.auth.handle_packet(&logon_response(EResult::Ok, 9)).unwrap();
    h.sent();

    tokio::time::sleep(Duration::from_millis(18_500)).await;
    let beats: Vec<_> = h.sent().into_iter().map(|m| m.emsg).collect();
    assert_eq!(beats, vec![EMsg::ClientHeartBeat, EMsg::ClientHeartBeat]);
}

#[test]
fn test_logon_response_legacy_is_protocol_violation() {
    let mut h = harness();
    h.auth.log_on(&details()).unwrap();
    let packet = PacketMsg::new(EMsg::ClientLogOnResponse, false, server_header(JobId::NONE), vec![1, 0, 0, 0]);

    let err = h.auth.handle_packet(&packet).unwrap_err();
    assert!(matches!(
        err,
        HandlerError::ProtocolViolation(ProtocolError::UnexpectedEncoding { .. })
    ));
    assert!(err.is_fatal());
    assert!(h.published().is_empty());
}

#[test]
fn test_logon_response_transient_results_change_nothing() {
    for result in [EResult::Fail, EResult::ServiceUnavailable, EResult::TryAnotherCM] {
        let mut h = harness();
        h.auth.log_on(&details()).unwrap();
        h.sent();

        h.auth.handle_packet(&logon_response(result, 9)).unwrap();

        assert_eq!(h.session().state(), SessionState::LoggingOn, "{result}");
        assert_eq!(h.session().session_id(), 0);
        assert!(h.published().is_empty(), "{result} should not publish");
        assert!(h.sent().is_empty());
        assert!(!h.auth.heartbeat_running());
    }
}

#[test]
fn test_logon_response_rejected_is_fatal_with_result() {
    let mut h = harness();
    h.auth.log_on(&details()).unwrap();

    let err = h
        .auth
        .handle_packet(&logon_response(EResult::InvalidPassword, 9))
        .unwrap_err();

    assert!(matches!(err, HandlerError::LogOnRejected(EResult::InvalidPassword)));
    assert!(err.is_fatal());
    assert_eq!(h.session().state(), SessionState::LoggedOff);
    assert_eq!(
        h.published(),
        vec![Event::LogOnFailed {
            result: EResult::InvalidPassword
        }]
    );
}

#[test]
fn test_logon_response_second_factor_stays_logging_on() {
    let mut h = harness();
    h.auth.log_on(&details()).unwrap();

    let err = h
        .auth
        .handle_packet(&logon_response(EResult::AccountLogonDeniedNeedTwoFactor, 0))
        .unwrap_err();

    assert!(matches!(err, HandlerError::LogOnRejected(_)));
    assert_eq!(h.session().state(), SessionState::LoggingOn);

    // The caller retries with the code.
    h.sent();
    h.auth.log_on(&details().with_two_factor_code("ABCDE")).unwrap();
    assert_eq!(h.sent().len(), 1);
}

// =========================================================================
// Logged off
// =========================================================================

#[tokio::test]
async fn test_logged_off_proto_ends_session_and_heartbeat() {
    let mut h = harness();
    h.auth.log_on(&details()).unwrap();
    h.auth.handle_packet(&logon_response(EResult::Ok, 9)).unwrap();
    h.published();

    let packet = PacketMsg::from_proto(
        EMsg::ClientLoggedOff,
        server_header(JobId::NONE),
        &CMsgClientLoggedOff {
            eresult: Some(EResult::LoggedInElsewhere.raw() as i32),
        },
    );
    h.auth.handle_packet(&packet).unwrap();

    assert_eq!(h.session().state(), SessionState::LoggedOff);
    assert_eq!(h.session().session_id(), 0);
    assert!(!h.auth.heartbeat_running());
    assert_eq!(
        h.published(),
        vec![Event::LoggedOff {
            result: EResult::LoggedInElsewhere
        }]
    );
}

#[tokio::test]
async fn test_logged_off_is_terminal_for_later_packets() {
    let mut h = harness();
    h.auth.log_on(&details()).unwrap();
    h.auth.handle_packet(&logon_response(EResult::Ok, 9)).unwrap();
    let logged_off = PacketMsg::from_proto(
        EMsg::ClientLoggedOff,
        server_header(JobId::NONE),
        &CMsgClientLoggedOff {
            eresult: Some(EResult::LoggedInElsewhere.raw() as i32),
        },
    );
    h.auth.handle_packet(&logged_off).unwrap();
    h.sent();
    h.published();

    h.auth.handle_packet(&logon_response(EResult::Ok, 9)).unwrap();
    h.auth
        .handle_packet(&PacketMsg::from_proto(
            EMsg::ClientNewLoginKey,
            server_header(JobId::NONE),
            &CMsgClientNewLoginKey {
                unique_id: Some(3),
                login_key: Some("key".into()),
            },
        ))
        .unwrap();

    assert_eq!(h.session().state(), SessionState::LoggedOff);
    assert_eq!(h.session().session_id(), 0);
    assert!(!h.auth.heartbeat_running());
    assert!(h.sent().is_empty());
    assert!(h.published().is_empty());
}

#[test]
fn test_logged_off_legacy_reads_fixed_body() {
    let mut h = harness();
    let body = MsgClientLoggedOff {
        result: EResult::Banned,
        sec_min_reconnect_hint: 0,
        sec_max_reconnect_hint: 0,
    };
    let packet = PacketMsg::from_legacy(EMsg::ClientLoggedOff, server_header(JobId::NONE), &body, &[]);
    h.auth.handle_packet(&packet).unwrap();

    assert_eq!(
        h.published(),
        vec![Event::LoggedOff {
            result: EResult::Banned
        }]
    );
}

#[test]
fn test_logged_off_legacy_truncated_is_violation() {
    let mut h = harness();
    let packet = PacketMsg::new(EMsg::ClientLoggedOff, false, server_header(JobId::NONE), vec![6, 0]);

    let err = h.auth.handle_packet(&packet).unwrap_err();
    assert!(matches!(
        err,
        HandlerError::ProtocolViolation(ProtocolError::Truncated { .. })
    ));
}

// =========================================================================
// Login key and machine auth
// =========================================================================

#[test]
fn test_new_login_key_is_acknowledged_and_published() {
    let mut h = harness();
    let packet = PacketMsg::from_proto(
        EMsg::ClientNewLoginKey,
        server_header(JobId::NONE),
        &CMsgClientNewLoginKey {
            unique_id: Some(31337),
            login_key: Some("reuse-me".into()),
        },
    );
    h.auth.handle_packet(&packet).unwrap();

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].emsg, EMsg::ClientNewLoginKeyAccepted);
    let ack: CMsgClientNewLoginKeyAccepted =
        sent[0].to_packet(Identity::default()).read_proto().unwrap();
    assert_eq!(ack.unique_id, Some(31337));

    assert_eq!(
        h.published(),
        vec![Event::LoginKey {
            unique_id: 31337,
            login_key: "reuse-me".into()
        }]
    );
}

#[test]
fn test_machine_auth_replies_with_sha1_and_request_job() {
    let mut h = harness();
    let packet = PacketMsg::from_proto(
        EMsg::ClientUpdateMachineAuth,
        server_header(JobId(0xABCD)),
        &CMsgClientUpdateMachineAuth {
            filename: Some("sentry".into()),
            offset: Some(0),
            cubtowrite: Some(3),
            bytes: Some(b"abc".to_vec()),
        },
    );
    h.auth.handle_packet(&packet).unwrap();

    let expected: [u8; 20] = [
        0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78, 0x50,
        0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d,
    ];

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].emsg, EMsg::ClientUpdateMachineAuthResponse);
    assert_eq!(sent[0].target_job_id, JobId(0xABCD));
    let reply: CMsgClientUpdateMachineAuthResponse =
        sent[0].to_packet(Identity::default()).read_proto().unwrap();
    assert_eq!(reply.sha_file, Some(expected.to_vec()));
    assert_eq!(reply.filename.as_deref(), Some("sentry"));
    assert_eq!(reply.filesize, Some(3));

    assert_eq!(h.published(), vec![Event::MachineAuthUpdated { hash: expected }]);
}

// =========================================================================
// Account info and ignored messages
// =========================================================================

#[test]
fn test_account_info_is_published() {
    let mut h = harness();
    let packet = PacketMsg::from_proto(
        EMsg::ClientAccountInfo,
        server_header(JobId::NONE),
        &CMsgClientAccountInfo {
            persona_name: Some("Alice".into()),
            ip_country: Some("NZ".into()),
            count_authed_computers: Some(2),
            account_flags: Some(0x4),
            facebook_name: Some("alice.fb".into()),
            ..Default::default()
        },
    );
    h.auth.handle_packet(&packet).unwrap();

    let events = h.published();
    let [Event::AccountInfo(info)] = events.as_slice() else {
        panic!("expected one AccountInfo, got {events:?}");
    };
    assert_eq!(info.persona_name, "Alice");
    assert_eq!(info.country, "NZ");
    assert_eq!(info.authed_computers, 2);
    assert!(info.flags.contains(0x4));
    assert_eq!(info.facebook_name, "alice.fb");
}

#[test]
fn test_account_info_reads_salt_as_bytes() {
    let mut h = harness();
    // Field 3 (salt) and field 4 (digest) as length-delimited bytes.
    let mut body = vec![0x1a, 0x08];
    body.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
    body.extend_from_slice(&[0x22, 0x02, 0xab, 0xcd]);
    let packet = PacketMsg::new(EMsg::ClientAccountInfo, true, server_header(JobId::NONE), body);

    h.auth.handle_packet(&packet).unwrap();

    let events = h.published();
    let [Event::AccountInfo(info)] = events.as_slice() else {
        panic!("expected one AccountInfo, got {events:?}");
    };
    assert_eq!(info.password_salt, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(info.password_digest, vec![0xab, 0xcd]);
}

#[test]
fn test_unimplemented_messages_are_silent_no_ops() {
    let mut h = harness();
    for emsg in [
        EMsg::ClientWalletInfoUpdate,
        EMsg::ClientRequestWebAPIAuthenticateUserNonceResponse,
        EMsg::ClientMarketingMessageUpdate2,
        EMsg::ClientSessionToken,
    ] {
        let packet = PacketMsg::new(emsg, true, server_header(JobId::NONE), vec![0xFF, 0x00]);
        assert!(h.auth.handle_packet(&packet).is_ok(), "{emsg} should be ignored");
    }
    assert!(h.published().is_empty());
    assert!(h.sent().is_empty());
}

// =========================================================================
// Teardown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_teardown_stops_heartbeat() {
    let mut h = harness();
    h.auth.log_on(&details()).unwrap();
    h.auth.handle_packet(&logon_response(EResult::Ok, 5)).unwrap();
    h.sent();

    h.auth.teardown();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert!(h.sent().is_empty(), "no heartbeat after teardown");
    assert!(!h.auth.heartbeat_running());
    assert_eq!(h.session().state(), SessionState::Disconnected);
}

// =========================================================================
// Config
// =========================================================================

#[test]
fn test_auth_config_partial_json_keeps_defaults() {
    let config: AuthConfig =
        serde_json::from_str(r#"{"client_language":"german","heartbeat":{"interval_ms":0}}"#)
            .unwrap();

    assert_eq!(config.client_language, "german");
    assert_eq!(config.protocol_version, AuthConfig::default().protocol_version);
    assert_eq!(config.heartbeat.interval_ms, 0);
    assert_eq!(
        config.heartbeat.max_interval_ms,
        AuthConfig::default().heartbeat.max_interval_ms
    );
}
