use crate::model::negotiation::EventQueue;
use crate::model::{IceCandidate, IceServer, MediaStream, MediaTrack, PeerSessionError};
use crate::model::SessionDescription;
use async_trait::async_trait;

/// The platform's peer-connection capability. Every operation is awaited
/// before the next negotiation step runs.
///
/// Locally discovered ICE candidates and connection failures are reported
/// through the [`EventQueue`] handed to [`PeerSessionFactory::create`].
#[async_trait]
pub trait PeerSession: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, PeerSessionError>;

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerSessionError>;

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerSessionError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerSessionError>;

    async fn add_track(
        &self,
        track: &MediaTrack,
        stream: &MediaStream,
    ) -> Result<(), PeerSessionError>;

    async fn close(&self) -> Result<(), PeerSessionError>;
}

#[async_trait]
pub trait PeerSessionFactory: Send + Sync {
    async fn create(
        &self,
        ice_servers: &[IceServer],
        events: EventQueue,
    ) -> Result<Box<dyn PeerSession>, PeerSessionError>;
}
