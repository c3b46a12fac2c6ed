//! Routes inbound packets to the handlers registered for their EMsg.
//!
//! The dispatcher is a lookup table built once, before the first packet
//! arrives. [`Dispatcher::dispatch`] runs every handler for a packet to
//! completion before returning, and the client calls it for one packet at a
//! time, so handlers see server updates in arrival order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cinder_protocol::{EMsg, HandlerError, PacketHandler, PacketMsg};

pub struct Dispatcher {
    routes: HashMap<EMsg, Vec<Arc<dyn PacketHandler>>>,
    handlers: Vec<Arc<dyn PacketHandler>>,
    active: AtomicBool,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            handlers: Vec::new(),
            active: AtomicBool::new(false),
        }
    }

    /// Adds `handler` for every EMsg it declares.
    ///
    /// When several handlers share an EMsg they run in registration order.
    pub fn register(&mut self, handler: Arc<dyn PacketHandler>) {
        for &emsg in handler.handles() {
            self.routes
                .entry(emsg)
                .or_default()
                .push(Arc::clone(&handler));
        }
        tracing::debug!(
            handler = handler.name(),
            kinds = handler.handles().len(),
            "handler registered"
        );
        self.handlers.push(handler);
    }

    pub fn is_routed(&self, emsg: EMsg) -> bool {
        self.routes.contains_key(&emsg)
    }

    /// Starts accepting packets for a new connection.
    pub fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Hands `packet` to its handlers.
    ///
    /// Packets nobody handles are dropped, as are packets that arrive after
    /// [`teardown`](Self::teardown). A non-fatal handler error is logged and
    /// the remaining handlers still run.
    ///
    /// # Errors
    /// The first fatal [`HandlerError`]; the caller must close the
    /// connection.
    pub fn dispatch(&self, packet: &PacketMsg) -> Result<(), HandlerError> {
        if !self.is_active() {
            tracing::trace!(emsg = %packet.emsg, "dispatcher inactive, packet dropped");
            return Ok(());
        }
        let Some(handlers) = self.routes.get(&packet.emsg) else {
            tracing::trace!(emsg = %packet.emsg, "no handler, packet dropped");
            return Ok(());
        };

        for handler in handlers {
            match handler.handle_packet(packet) {
                Ok(()) => {}
                Err(e) if !e.is_fatal() => {
                    tracing::warn!(
                        handler = handler.name(),
                        emsg = %packet.emsg,
                        error = %e,
                        "malformed message dropped"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        handler = handler.name(),
                        emsg = %packet.emsg,
                        error = %e,
                        "fatal handler error"
                    );
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Stops dispatching and lets every handler release its resources.
    pub fn teardown(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        for handler in &self.handlers {
            handler.teardown();
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
