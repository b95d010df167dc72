use super::{NegotiationState, PendingCandidates};
use crate::model::{
    IceCandidate, MediaStream, NegotiationError, PeerSession, SessionDescription, Transport,
};
use tracing::{debug, warn};

/// Resources owned by one negotiation. Everything here is released by
/// [`NegotiationContext::teardown`].
pub struct NegotiationContext {
    pub(crate) local_stream: Option<MediaStream>,
    pub(crate) peer_session: Option<Box<dyn PeerSession>>,
    pub(crate) transport: Option<Box<dyn Transport>>,
    pub(crate) pending: PendingCandidates,
    pub(crate) remote_description_set: bool,
    pub(crate) state: NegotiationState,
}

impl Default for NegotiationContext {
    fn default() -> Self {
        Self {
            local_stream: None,
            peer_session: None,
            transport: None,
            pending: PendingCandidates::new(),
            remote_description_set: false,
            state: NegotiationState::Idle,
        }
    }
}

impl NegotiationContext {
    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Attach every local track, create the offer and commit it as the local
    /// description. The offer is returned only once committed.
    pub(crate) async fn commit_offer(&self) -> Result<SessionDescription, NegotiationError> {
        let (Some(peer), Some(stream)) = (&self.peer_session, &self.local_stream) else {
            return Err(NegotiationError::InvalidState(self.state));
        };
        for track in stream.tracks() {
            peer.add_track(track, stream).await?;
        }
        let offer = peer.create_offer().await?;
        peer.set_local_description(offer.clone()).await?;
        Ok(offer)
    }

    /// Apply the answer, then replay buffered candidates in arrival order
    pub(crate) async fn apply_answer(
        &mut self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let Some(peer) = &self.peer_session else {
            return Err(NegotiationError::InvalidState(self.state));
        };
        peer.set_remote_description(answer).await?;
        self.remote_description_set = true;

        let buffered = self.pending.drain();
        debug!(count = buffered.len(), "Replaying buffered candidates");
        for candidate in buffered {
            if let Err(e) = peer.add_ice_candidate(candidate).await {
                warn!(error = %e, "Buffered candidate rejected");
            }
        }
        Ok(())
    }

    /// Apply now if the remote description is set, otherwise buffer
    pub(crate) async fn accept_candidate(&mut self, candidate: IceCandidate) {
        match (&self.peer_session, self.remote_description_set) {
            (Some(peer), true) => {
                if let Err(e) = peer.add_ice_candidate(candidate).await {
                    warn!(error = %e, "Remote candidate rejected");
                }
            }
            _ => {
                self.pending.push(candidate);
                debug!(pending = self.pending.len(), "Remote candidate buffered");
            }
        }
    }

    /// Stop every track, close the peer session and the channel. Idempotent.
    pub async fn teardown(&mut self) {
        if let Some(stream) = self.local_stream.take() {
            stream.stop();
            debug!(stream_id = %stream.id(), "Local stream released");
        }
        if let Some(peer) = self.peer_session.take() {
            if let Err(e) = peer.close().await {
                warn!(error = %e, "Peer session did not close cleanly");
            }
            debug!("Peer session closed");
        }
        if let Some(transport) = self.transport.take() {
            transport.close();
        }
        self.pending.clear();
        self.remote_description_set = false;
    }
}
