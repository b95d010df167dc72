mod error;
mod ice_server;
mod media;
pub mod negotiation;
pub mod network;
mod peer;
mod session;

#[cfg(feature = "webrtc")]
mod webrtc_peer;

pub use error::{MediaError, MessageError, NegotiationError, PeerSessionError};
pub use ice_server::{IceServer, DEFAULT_STUN_URL};
pub use media::{
    CaptureDevice, MediaConstraints, MediaStream, MediaTrack, NullVideoSink,
    SyntheticCaptureDevice, TrackKind, VideoSink,
};
pub use negotiation::{
    Backoff, EventQueue, NegotiationEvent, NegotiationState, NegotiationStatus, Negotiator,
    NegotiatorDeps, RetryPolicy,
};
pub use network::{
    ChannelState, IceCandidate, InboundMessage, NetworkError, SessionDescription, SignalingKind,
    SignalingMessage, Transport, TransportConnector, VideoFrameMessage, VIDEO_FRAME_TYPE,
};
pub use peer::{PeerSession, PeerSessionFactory};
pub use session::{SessionId, SessionState};

#[cfg(feature = "client")]
pub use network::{WebSocketConnection, WebSocketConnector};

#[cfg(feature = "webrtc")]
pub use webrtc_peer::{WebRtcPeerSession, WebRtcPeerSessionFactory};
