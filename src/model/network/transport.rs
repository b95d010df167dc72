use super::{NetworkError, SignalingMessage};
use crate::model::negotiation::EventQueue;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

/// Client end of the signaling channel.
///
/// Inbound text frames arrive as [`NegotiationEvent::Message`] on the queue
/// given to [`TransportConnector::connect`], in the order the socket
/// delivered them, followed by a single [`NegotiationEvent::ChannelClosed`].
/// Reconnecting is the caller's job.
///
/// [`NegotiationEvent::Message`]: crate::model::NegotiationEvent::Message
/// [`NegotiationEvent::ChannelClosed`]: crate::model::NegotiationEvent::ChannelClosed
pub trait Transport: Send + Sync {
    /// Enqueue without waiting; logged and dropped unless the channel is open
    fn send(&self, message: &SignalingMessage);

    fn state(&self) -> ChannelState;

    /// Idempotent
    fn close(&self);
}

#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        events: EventQueue,
    ) -> Result<Box<dyn Transport>, NetworkError>;
}
