//! Fire-and-forget queue of outbound messages.

use tokio::sync::mpsc;

use crate::envelope::OutboundMsg;

pub type OutboundReceiver = mpsc::UnboundedReceiver<OutboundMsg>;

/// Handle handlers use to send messages.
///
/// Sending only enqueues; a writer task owned by the client drains the
/// queue, encodes each message and writes it to the connection. Handlers
/// therefore never wait on network I/O.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<OutboundMsg>,
}

impl Outbox {
    /// Creates an outbox and the receiver that drains it.
    pub fn channel() -> (Self, OutboundReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, msg: OutboundMsg) {
        let emsg = msg.emsg;
        if self.tx.send(msg).is_err() {
            tracing::warn!(%emsg, "outbound queue closed, message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::EMsg;
    use crate::messages::CMsgClientHeartBeat;

    #[test]
    fn test_send_enqueues_in_order() {
        let (outbox, mut rx) = Outbox::channel();
        outbox.send(OutboundMsg::proto(EMsg::ClientHeartBeat, &CMsgClientHeartBeat {}));
        outbox.send(OutboundMsg::proto(EMsg::ClientLogon, &CMsgClientHeartBeat {}));

        assert_eq!(rx.try_recv().unwrap().emsg, EMsg::ClientHeartBeat);
        assert_eq!(rx.try_recv().unwrap().emsg, EMsg::ClientLogon);
    }

    #[test]
    fn test_send_after_receiver_dropped_does_not_panic() {
        let (outbox, rx) = Outbox::channel();
        drop(rx);
        outbox.send(OutboundMsg::proto(EMsg::ClientHeartBeat, &CMsgClientHeartBeat {}));
    }
}
