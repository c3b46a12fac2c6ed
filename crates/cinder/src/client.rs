//! `Client` builder and connection loop.
//!
//! The client ties the layers together: a [`Connection`] delivers frames,
//! the [`FrameCodec`] turns them into packets, the [`Dispatcher`] hands
//! them to [`Auth`] and [`Social`], and whatever those queue in the outbox
//! is encoded and written back.
//!
//! One call to [`Client::run`] serves one connection. Inbound packets are
//! read and dispatched strictly one after another on the caller's task; a
//! writer task drains the outbox, so a slow write never holds up dispatch.

use std::sync::Arc;

use bytes::Bytes;
use cinder_protocol::{
    Event, EventBus, EventReceiver, FrameCodec, Outbox, OutboundReceiver, PacketHandler,
    SteamCodec,
};
use cinder_session::{Auth, LogOnDetails, Session};
use cinder_social::Social;
use cinder_transport::{Connection, TransportError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinError;

use crate::dispatch::Dispatcher;
use crate::{ClientConfig, ClientError};

/// Builder for configuring a [`Client`].
///
/// # Example
///
/// ```rust,ignore
/// use cinder::prelude::*;
///
/// let client = Client::builder().config(config).build();
/// client.log_on(&LogOnDetails::new("user", "pass"))?;
/// client.run(WebSocketConnection::connect(&url).await?).await
/// ```
pub struct ClientBuilder<C = SteamCodec> {
    config: ClientConfig,
    codec: C,
}

impl ClientBuilder<SteamCodec> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            codec: SteamCodec,
        }
    }
}

impl Default for ClientBuilder<SteamCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: FrameCodec> ClientBuilder<C> {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the frame codec.
    pub fn codec<C2: FrameCodec>(self, codec: C2) -> ClientBuilder<C2> {
        ClientBuilder {
            config: self.config,
            codec,
        }
    }

    /// Wires the session, handlers and dispatcher together.
    ///
    /// Auth is registered before Social, so for a message both handle
    /// (account info) the session side runs first.
    pub fn build(self) -> Client<C> {
        let events = EventBus::new(self.config.event_capacity);
        let (outbox, outbound) = Outbox::channel();
        let session = Arc::new(Session::new());

        let auth = Arc::new(Auth::new(
            Arc::clone(&session),
            outbox.clone(),
            events.clone(),
            self.config.auth.clone(),
        ));
        let social = Arc::new(Social::new(Arc::clone(&session), outbox, events.clone()));

        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Arc::clone(&auth) as Arc<dyn PacketHandler>);
        dispatcher.register(Arc::clone(&social) as Arc<dyn PacketHandler>);

        Client {
            config: self.config,
            codec: Arc::new(self.codec),
            session,
            auth,
            social,
            events,
            dispatcher,
            outbound: Arc::new(Mutex::new(outbound)),
        }
    }
}

/// A client for one account.
///
/// Share it behind an `Arc`: one task awaits [`run`](Self::run) while
/// others subscribe to events and call the social API.
pub struct Client<C: FrameCodec = SteamCodec> {
    config: ClientConfig,
    codec: Arc<C>,
    session: Arc<Session>,
    auth: Arc<Auth>,
    social: Arc<Social>,
    events: EventBus,
    dispatcher: Dispatcher,
    /// Held by the writer task for the lifetime of a connection.
    outbound: Arc<Mutex<OutboundReceiver>>,
}

impl Client<SteamCodec> {
    pub fn builder() -> ClientBuilder<SteamCodec> {
        ClientBuilder::new()
    }
}

impl<C: FrameCodec> Client<C> {
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn social(&self) -> &Social {
        &self.social
    }

    /// Subscribes to every event published from now on.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Queues a logon request; it is written once [`run`](Self::run) starts.
    pub fn log_on(&self, details: &LogOnDetails) -> Result<(), ClientError> {
        Ok(self.auth.log_on(details)?)
    }

    /// Serves one connection until it closes or a fatal error occurs.
    ///
    /// On return the heartbeat is stopped, the session is cleared and
    /// [`Event::Disconnected`] has been published. Messages still queued
    /// for the old connection are discarded; the client is ready to `run`
    /// again on a new connection.
    ///
    /// # Errors
    /// - `AlreadyRunning` if another `run` is in progress.
    /// - `Transport` if the connection fails.
    /// - `Protocol` if a frame cannot be decoded.
    /// - `Handler` if a handler hit a fatal condition (for example a
    ///   rejected logon).
    pub async fn run<T>(&self, conn: T) -> Result<(), ClientError>
    where
        T: Connection<Error = TransportError>,
    {
        let outbound = Arc::clone(&self.outbound)
            .try_lock_owned()
            .map_err(|_| ClientError::AlreadyRunning)?;

        let conn = Arc::new(conn);
        let conn_id = conn.id();
        tracing::info!(%conn_id, "connection started");
        self.dispatcher.activate();

        let mut writer = tokio::spawn(write_loop(
            Arc::clone(&conn),
            Arc::clone(&self.codec),
            Arc::clone(&self.session),
            outbound,
        ));
        let (result, writer_done) = tokio::select! {
            read = self.read_loop(&*conn) => (read, false),
            written = &mut writer => (writer_outcome(written), true),
        };
        if !writer_done {
            writer.abort();
            // Joining releases the outbox.
            let _ = writer.await;
        }

        self.dispatcher.teardown();
        if let Err(e) = conn.close().await {
            tracing::debug!(%conn_id, error = %e, "close failed");
        }
        let mut dropped = 0usize;
        {
            let mut outbound = self.outbound.lock().await;
            while outbound.try_recv().is_ok() {
                dropped += 1;
            }
        }

        match &result {
            Ok(()) => tracing::info!(%conn_id, dropped, "connection ended"),
            Err(e) => tracing::warn!(%conn_id, dropped, error = %e, "connection ended with error"),
        }
        self.events.publish(Event::Disconnected);
        result
    }

    async fn read_loop<T>(&self, conn: &T) -> Result<(), ClientError>
    where
        T: Connection<Error = TransportError>,
    {
        while let Some(data) = conn.recv().await? {
            self.on_frame(data)?;
        }
        Ok(())
    }

    fn on_frame(&self, data: Vec<u8>) -> Result<(), ClientError> {
        let packets = self.codec.decode_frame(Bytes::from(data))?;
        for packet in &packets {
            tracing::trace!(emsg = %packet.emsg, proto = packet.is_proto, "received");
            self.dispatcher.dispatch(packet)?;
        }
        Ok(())
    }
}

/// Encodes and writes queued messages until the connection fails or the
/// task is aborted.
async fn write_loop<T, C>(
    conn: Arc<T>,
    codec: Arc<C>,
    session: Arc<Session>,
    mut outbound: OwnedMutexGuard<OutboundReceiver>,
) -> Result<(), TransportError>
where
    T: Connection<Error = TransportError>,
    C: FrameCodec,
{
    while let Some(msg) = outbound.recv().await {
        let bytes = codec.encode(&msg, session.identity());
        tracing::trace!(emsg = %msg.emsg, len = bytes.len(), "sending");
        conn.send(&bytes).await?;
    }
    Ok(())
}

fn writer_outcome(joined: Result<Result<(), TransportError>, JoinError>) -> Result<(), ClientError> {
    match joined {
        Ok(result) => Ok(result?),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => Ok(()),
    }
}
