mod error;
mod signaling;
mod transport;

#[cfg(feature = "client")]
mod websocket_connection;

pub use error::NetworkError;
pub use signaling::{
    IceCandidate, InboundMessage, SessionDescription, SignalingKind, SignalingMessage,
    VideoFrameMessage, VIDEO_FRAME_TYPE,
};
pub use transport::{ChannelState, Transport, TransportConnector};

#[cfg(feature = "client")]
pub use websocket_connection::{WebSocketConnection, WebSocketConnector};
