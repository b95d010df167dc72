use crate::model::{IceCandidate, NegotiationError, NegotiationState};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::oneshot;
use tracing::debug;

/// Everything that can happen to a negotiation from the outside
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationEvent {
    /// Raw text frame received on the signaling channel
    Message(String),
    /// The signaling channel is gone
    ChannelClosed,
    /// Candidate gathered by the local Peer Session
    LocalCandidate(IceCandidate),
    /// The Peer Session reported its own failure
    PeerSessionFailed(String),
}

pub(crate) enum Command {
    Start(oneshot::Sender<Result<NegotiationState, NegotiationError>>),
    Stop(oneshot::Sender<()>),
    Event(NegotiationEvent),
}

#[derive(Clone, Debug)]
enum Target {
    Negotiator(WeakUnboundedSender<Command>),
    Channel(UnboundedSender<NegotiationEvent>),
}

/// Write end of a negotiation's inbound queue.
///
/// Handed to the transport and the peer session so their callbacks push
/// events instead of mutating state. Pushing after the negotiation is gone
/// is a no-op. A queue bound to a negotiator does not keep it alive: once
/// every [`Negotiator`](super::Negotiator) handle is dropped the task tears
/// down even though transports and peer sessions still hold queues.
#[derive(Clone, Debug)]
pub struct EventQueue {
    target: Target,
}

impl EventQueue {
    pub(crate) fn negotiator(sender: WeakUnboundedSender<Command>) -> Self {
        Self {
            target: Target::Negotiator(sender),
        }
    }

    /// A queue not bound to a negotiator, read through the returned receiver
    pub fn unbounded() -> (Self, UnboundedReceiver<NegotiationEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                target: Target::Channel(sender),
            },
            receiver,
        )
    }

    /// Returns false when nobody is listening anymore
    pub fn push(&self, event: NegotiationEvent) -> bool {
        let delivered = match &self.target {
            Target::Negotiator(sender) => sender
                .upgrade()
                .is_some_and(|sender| sender.send(Command::Event(event)).is_ok()),
            Target::Channel(sender) => sender.send(event).is_ok(),
        };
        if !delivered {
            debug!("Event dropped, queue closed");
        }
        delivered
    }
}
