//! The seam between the dispatcher and feature subsystems.

use crate::enums::EMsg;
use crate::envelope::PacketMsg;
use crate::HandlerError;

/// A feature subsystem that consumes inbound packets.
///
/// The dispatcher asks each handler once, at registration, which message
/// types it owns, then calls [`handle_packet`](Self::handle_packet) for
/// every matching packet in arrival order. Handlers run synchronously to
/// completion; anything slow (sending replies, timers) is handed off to the
/// outbox or a background task.
pub trait PacketHandler: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Message types this handler wants.
    fn handles(&self) -> &'static [EMsg];

    /// Processes one packet.
    ///
    /// # Errors
    /// See [`HandlerError`] for which errors end the session.
    fn handle_packet(&self, packet: &PacketMsg) -> Result<(), HandlerError>;

    /// Called once when the connection goes away.
    fn teardown(&self) {}
}
