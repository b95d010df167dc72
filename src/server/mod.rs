mod connection;
mod error;
mod frame_store;
mod route;
mod session_registry;
mod signaling_relay;
mod telemetry;
mod websocket_listener;

pub use connection::Connection;
pub use error::ServerError;
pub use frame_store::{
    FrameRecorder, FrameStore, FrameStoreError, JsonFileFrameStore, RecordedFrame,
    SessionRecording,
};
pub use route::create_signaling_route;
pub use session_registry::{MemorySessionRegistry, SessionRegistry};
pub use signaling_relay::{RouteOutcome, SignalingRelay};
pub use telemetry::{init_telemetry, shutdown_telemetry};

use crate::config::ServerConfig;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Shared by every connection handler
#[derive(Clone)]
pub struct ServerState {
    pub registry: Arc<dyn SessionRegistry>,
    pub relay: Arc<SignalingRelay>,
}

impl ServerState {
    pub fn new(registry: Arc<dyn SessionRegistry>, relay: SignalingRelay) -> Self {
        Self {
            registry,
            relay: Arc::new(relay),
        }
    }

    /// In-memory registry, plus frame recording when a frames directory is set
    pub fn from_config(config: &ServerConfig) -> Self {
        let registry: Arc<dyn SessionRegistry> = Arc::new(MemorySessionRegistry::new());
        let mut relay = SignalingRelay::new(registry.clone());
        if let Some(dir) = &config.frames_dir {
            info!(dir = %dir.display(), "Recording video frames");
            let store = Arc::new(JsonFileFrameStore::new(dir));
            relay = relay.with_recorder(FrameRecorder::new(store, config.max_frames_per_session));
        }
        Self::new(registry, relay)
    }
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: ServerState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    axum::serve(listener, create_signaling_route(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub async fn run(
    config: ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let address = config.address();
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ServerError::Bind { address, source })?;
    info!("Signaling relay listening on ws://{}", address);
    serve(listener, ServerState::from_config(&config), shutdown).await
}
