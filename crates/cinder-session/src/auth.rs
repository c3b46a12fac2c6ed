//! Logon handshake, heartbeat and machine-auth challenge.
//!
//! [`Auth`] is both the caller-facing logon API and the [`PacketHandler`]
//! for every authentication message. It is the only writer of the
//! [`Session`].
//!
//! # Logon flow
//!
//! 1. [`Auth::log_on`] validates the credentials, seeds the placeholder
//!    identity and queues one `ClientLogon`. It returns immediately.
//! 2. The server answers with `ClientLogOnResponse`:
//!    - `OK`: identity and session id are taken from the header, the
//!      heartbeat starts, [`Event::LoggedOn`] is published.
//!    - `Fail`, `ServiceUnavailable`, `TryAnotherCM`: nothing happens. The
//!      server drops the connection and the caller reconnects elsewhere.
//!    - anything else: [`Event::LogOnFailed`], then a fatal error that ends
//!      the connection. If a second factor was requested the caller logs
//!      on again with the code on the next connection.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use cinder_heartbeat::{spawn_heartbeat, HeartbeatConfig, HeartbeatHandle};
use cinder_protocol::legacy::MsgClientLoggedOff;
use cinder_protocol::messages::{
    CMsgClientAccountInfo, CMsgClientHeartBeat, CMsgClientLoggedOff, CMsgClientLogon,
    CMsgClientLogonResponse, CMsgClientNewLoginKey, CMsgClientNewLoginKeyAccepted,
    CMsgClientUpdateMachineAuth, CMsgClientUpdateMachineAuthResponse,
};
use cinder_protocol::{
    AccountFlags, AccountInfo, EMsg, EResult, Event, EventBus, HandlerError, LoggedOnDetails,
    MsgHeader, OutboundMsg, Outbox, PacketHandler, PacketMsg, SteamId, PROTOCOL_VERSION,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::{LogOnDetails, Session, SessionError, SessionState};

/// OS type reported in the logon request.
const CLIENT_OS_TYPE: u32 = 16;

// ---------------------------------------------------------------------------
// AuthConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub client_language: String,
    pub protocol_version: u32,
    /// Used when the logon response carries no usable interval.
    pub heartbeat: HeartbeatConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_language: "english".to_owned(),
            protocol_version: PROTOCOL_VERSION,
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

pub struct Auth {
    session: Arc<Session>,
    outbox: Outbox,
    events: EventBus,
    config: AuthConfig,
    heartbeat: Mutex<Option<HeartbeatHandle>>,
}

impl Auth {
    pub fn new(session: Arc<Session>, outbox: Outbox, events: EventBus, config: AuthConfig) -> Self {
        Self {
            session,
            outbox,
            events,
            config,
            heartbeat: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Queues a logon request.
    ///
    /// Only the placeholder identity and the `LoggingOn` phase are set here;
    /// everything else waits for the server's response.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty username or password, `InvalidState`
    /// when already logged on. Nothing is sent in either case.
    pub fn log_on(&self, details: &LogOnDetails) -> Result<(), SessionError> {
        details.validate()?;
        self.session
            .transition_unless(SessionState::LoggedOn, SessionState::LoggingOn)
            .map_err(SessionError::InvalidState)?;
        self.session.set_steam_id(SteamId::logon_placeholder());

        let sentry_result = if details.sentry_hash.is_some() {
            EResult::Ok
        } else {
            EResult::FileNotFound
        };
        let logon = CMsgClientLogon {
            protocol_version: Some(self.config.protocol_version),
            client_language: Some(self.config.client_language.clone()),
            client_os_type: Some(CLIENT_OS_TYPE),
            account_name: Some(details.username.clone()),
            password: Some(details.password.clone()),
            should_remember_password: Some(details.should_remember_password),
            sha_sentryfile: details.sentry_hash.clone(),
            eresult_sentryfile: Some(sentry_result.raw() as i32),
            auth_code: details.auth_code.clone(),
            two_factor_code: details.two_factor_code.clone(),
            ..Default::default()
        };
        self.outbox.send(OutboundMsg::proto(EMsg::ClientLogon, &logon));
        tracing::info!(
            username = %details.username,
            has_sentry = details.sentry_hash.is_some(),
            "logon sent"
        );
        Ok(())
    }

    /// Stops the heartbeat and forgets the session after the connection
    /// closes.
    pub fn disconnect(&self) {
        self.stop_heartbeat();
        self.session.clear();
        self.session.set_state(SessionState::Disconnected);
    }

    // -----------------------------------------------------------------------
    // Heartbeat
    // -----------------------------------------------------------------------

    fn start_heartbeat(&self, interval: Duration) {
        let config = HeartbeatConfig {
            interval_ms: interval.as_millis() as u64,
            ..self.config.heartbeat.clone()
        }
        .validated();
        self.session.set_heartbeat_interval(config.interval());

        let outbox = self.outbox.clone();
        let session = Arc::clone(&self.session);
        let handle = spawn_heartbeat(config, move |_| {
            if !session.is_logged_on() {
                return false;
            }
            outbox.send(OutboundMsg::proto(EMsg::ClientHeartBeat, &CMsgClientHeartBeat {}));
            true
        });
        tracing::info!(interval_ms = interval.as_millis() as u64, "heartbeat started");

        if let Some(previous) = self.heartbeat.lock().replace(handle) {
            previous.stop();
        }
    }

    fn stop_heartbeat(&self) {
        if let Some(handle) = self.heartbeat.lock().take() {
            handle.stop();
        }
        self.session.set_heartbeat_interval(None);
    }

    /// Whether a heartbeat task is currently running.
    pub fn heartbeat_running(&self) -> bool {
        self.heartbeat
            .lock()
            .as_ref()
            .is_some_and(HeartbeatHandle::is_running)
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    fn handle_logon_response(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let body: CMsgClientLogonResponse =
            packet.read_proto().map_err(HandlerError::ProtocolViolation)?;
        let result = body.result();

        if result == EResult::Ok {
            let header = packet.header;
            self.session.set_identity(header.steam_id, header.session_id);

            let interval = match body.out_of_game_heartbeat_seconds {
                Some(secs) if secs > 0 => Duration::from_secs(secs as u64),
                _ => Duration::from_millis(self.config.heartbeat.interval_ms),
            };
            self.start_heartbeat(interval);
            self.session.set_state(SessionState::LoggedOn);

            tracing::info!(
                steam_id = %header.steam_id,
                session_id = header.session_id,
                "logged on"
            );
            self.events
                .publish(Event::LoggedOn(Box::new(logged_on_details(header, &body))));
            return Ok(());
        }

        if result.is_transient_logon_failure() {
            tracing::debug!(%result, "transient logon result, waiting for disconnect");
            return Ok(());
        }

        if result.needs_second_factor() {
            tracing::warn!(%result, "logon needs a second factor");
        } else {
            self.session.set_state(SessionState::LoggedOff);
            tracing::warn!(%result, "logon rejected");
        }
        self.events.publish(Event::LogOnFailed { result });
        Err(HandlerError::LogOnRejected(result))
    }

    fn handle_logged_off(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let result = if packet.is_proto {
            let body: CMsgClientLoggedOff =
                packet.read_proto().map_err(HandlerError::ProtocolViolation)?;
            EResult::from_i32(body.eresult.unwrap_or(2))
        } else {
            let (body, _) = packet
                .read_legacy::<MsgClientLoggedOff>()
                .map_err(HandlerError::ProtocolViolation)?;
            body.result
        };

        self.stop_heartbeat();
        self.session.clear();
        self.session.set_state(SessionState::LoggedOff);
        tracing::info!(%result, "logged off");
        self.events.publish(Event::LoggedOff { result });
        Ok(())
    }

    fn handle_new_login_key(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let body: CMsgClientNewLoginKey =
            packet.read_proto().map_err(HandlerError::ProtocolViolation)?;
        let unique_id = body.unique_id.unwrap_or_default();

        let ack = CMsgClientNewLoginKeyAccepted {
            unique_id: Some(unique_id),
        };
        self.outbox
            .send(OutboundMsg::proto(EMsg::ClientNewLoginKeyAccepted, &ack));
        tracing::debug!(unique_id, "login key accepted");

        self.events.publish(Event::LoginKey {
            unique_id,
            login_key: body.login_key.unwrap_or_default(),
        });
        Ok(())
    }

    fn handle_update_machine_auth(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let body: CMsgClientUpdateMachineAuth =
            packet.read_proto().map_err(HandlerError::ProtocolViolation)?;
        let data = body.bytes.unwrap_or_default();
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&Sha1::digest(&data));

        let response = CMsgClientUpdateMachineAuthResponse {
            filename: body.filename,
            eresult: Some(EResult::Ok.raw() as i32),
            filesize: Some(data.len() as u32),
            sha_file: Some(hash.to_vec()),
            offset: body.offset,
            cubwrote: body.cubtowrite,
            ..Default::default()
        };
        let job = packet.source_job_id();
        self.outbox.send(
            OutboundMsg::proto(EMsg::ClientUpdateMachineAuthResponse, &response).in_reply_to(job),
        );
        tracing::info!(%job, bytes = data.len(), "machine auth updated");

        self.events.publish(Event::MachineAuthUpdated { hash });
        Ok(())
    }

    fn handle_account_info(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        let body: CMsgClientAccountInfo =
            packet.read_proto().map_err(HandlerError::ProtocolViolation)?;
        let info = AccountInfo {
            persona_name: body.persona_name.unwrap_or_default(),
            country: body.ip_country.unwrap_or_default(),
            password_salt: body.salt_password.unwrap_or_default(),
            password_digest: body.sha_digest_password.unwrap_or_default(),
            authed_computers: body.count_authed_computers.unwrap_or_default(),
            locked_with_ipt: body.locked_with_ipt.unwrap_or_default(),
            flags: AccountFlags(body.account_flags.unwrap_or_default()),
            facebook_id: body.facebook_id.unwrap_or_default(),
            facebook_name: body.facebook_name.unwrap_or_default(),
        };
        self.events.publish(Event::AccountInfo(Box::new(info)));
        Ok(())
    }
}

fn logged_on_details(header: MsgHeader, body: &CMsgClientLogonResponse) -> LoggedOnDetails {
    LoggedOnDetails {
        steam_id: header.steam_id,
        session_id: header.session_id,
        out_of_game_heartbeat_seconds: body.out_of_game_heartbeat_seconds.unwrap_or_default(),
        in_game_heartbeat_seconds: body.in_game_heartbeat_seconds.unwrap_or_default(),
        public_ip: body.public_ip.map(Ipv4Addr::from),
        server_time: body.rtime32_server_time.unwrap_or_default(),
        account_flags: AccountFlags(body.account_flags.unwrap_or_default()),
        cell_id: body.cell_id.unwrap_or_default(),
        cell_id_ping_threshold: body.cell_id_ping_threshold.unwrap_or_default(),
        email_domain: body.email_domain.clone(),
        vanity_url: body.vanity_url.clone(),
        ip_country_code: body.ip_country_code.clone(),
        client_supplied_steam_id: body.client_supplied_steamid.map(SteamId),
        count_login_failures_to_migrate: body.count_loginfailures_to_migrate.unwrap_or_default(),
        count_disconnects_to_migrate: body.count_disconnects_to_migrate.unwrap_or_default(),
        webapi_authenticate_user_nonce: body.webapi_authenticate_user_nonce.clone(),
        client_instance_id: body.client_instance_id,
    }
}

impl PacketHandler for Auth {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn handles(&self) -> &'static [EMsg] {
        &[
            EMsg::ClientLogOnResponse,
            EMsg::ClientLoggedOff,
            EMsg::ClientNewLoginKey,
            EMsg::ClientUpdateMachineAuth,
            EMsg::ClientAccountInfo,
            EMsg::ClientSessionToken,
            EMsg::ClientWalletInfoUpdate,
            EMsg::ClientRequestWebAPIAuthenticateUserNonceResponse,
            EMsg::ClientMarketingMessageUpdate2,
        ]
    }

    fn handle_packet(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        if self.session.state() == SessionState::LoggedOff {
            tracing::trace!(emsg = %packet.emsg, "logged off, packet dropped");
            return Ok(());
        }
        match packet.emsg {
            EMsg::ClientLogOnResponse => self.handle_logon_response(packet),
            EMsg::ClientLoggedOff => self.handle_logged_off(packet),
            EMsg::ClientNewLoginKey => self.handle_new_login_key(packet),
            EMsg::ClientUpdateMachineAuth => self.handle_update_machine_auth(packet),
            EMsg::ClientAccountInfo => self.handle_account_info(packet),
            // Not handled yet.
            EMsg::ClientSessionToken
            | EMsg::ClientWalletInfoUpdate
            | EMsg::ClientRequestWebAPIAuthenticateUserNonceResponse
            | EMsg::ClientMarketingMessageUpdate2 => {
                tracing::trace!(emsg = %packet.emsg, "ignored");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn teardown(&self) {
        self.disconnect();
    }
}
