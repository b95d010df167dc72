pub mod config;
pub mod model;

#[cfg(feature = "server")]
pub mod server;

pub mod prelude {
    pub use crate::config::{ClientConfig, ServerConfig, TelemetryConfig};
    pub use crate::model::{
        CaptureDevice, IceServer, MediaConstraints, NegotiationError, NegotiationState,
        NegotiationStatus, Negotiator, NegotiatorDeps, PeerSession, PeerSessionFactory,
        RetryPolicy, SignalingMessage, VideoSink,
    };

    #[cfg(feature = "client")]
    pub use crate::model::WebSocketConnector;

    #[cfg(feature = "webrtc")]
    pub use crate::model::WebRtcPeerSessionFactory;
}
