use crate::model::negotiation::{EventQueue, NegotiationEvent};
use crate::model::{
    IceCandidate, IceServer, MediaStream, MediaTrack, PeerSession, PeerSessionError,
    PeerSessionFactory, SessionDescription, TrackKind,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

/// Builds [`WebRtcPeerSession`]s with default codecs and interceptors
#[derive(Debug, Default, Clone, Copy)]
pub struct WebRtcPeerSessionFactory;

#[async_trait]
impl PeerSessionFactory for WebRtcPeerSessionFactory {
    async fn create(
        &self,
        ice_servers: &[IceServer],
        events: EventQueue,
    ) -> Result<Box<dyn PeerSession>, PeerSessionError> {
        let session = WebRtcPeerSession::new(ice_servers, events).await?;
        Ok(Box::new(session))
    }
}

pub struct WebRtcPeerSession {
    peer_connection: Arc<RTCPeerConnection>,
}

impl WebRtcPeerSession {
    pub async fn new(
        ice_servers: &[IceServer],
        events: EventQueue,
    ) -> Result<Self, PeerSessionError> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| PeerSessionError::new("registerCodecs", e))?;
        let interceptor_registry =
            register_default_interceptors(Default::default(), &mut media_engine)
                .map_err(|e| PeerSessionError::new("registerInterceptors", e))?;
        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptor_registry)
            .build();

        let config = RTCConfiguration {
            ice_servers: ice_servers.iter().map(to_rtc_ice_server).collect(),
            ..Default::default()
        };
        let peer_connection = Arc::new(
            api.new_peer_connection(config)
                .await
                .map_err(|e| PeerSessionError::new("createPeerConnection", e))?,
        );

        let candidate_events = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let events = candidate_events.clone();
            Box::pin(async move {
                let Some(candidate) = candidate else {
                    debug!("ICE gathering complete");
                    return;
                };
                match candidate.to_json().map(|init| serde_json::to_value(init)) {
                    Ok(Ok(value)) => {
                        events.push(NegotiationEvent::LocalCandidate(IceCandidate::new(value)));
                    }
                    Ok(Err(e)) => warn!(error = %e, "Failed to encode local candidate"),
                    Err(e) => warn!(error = %e, "Failed to describe local candidate"),
                }
            })
        }));

        peer_connection.on_peer_connection_state_change(Box::new(
            move |state: RTCPeerConnectionState| {
                let events = events.clone();
                Box::pin(async move {
                    info!(%state, "Peer connection state changed");
                    if state == RTCPeerConnectionState::Failed {
                        events.push(NegotiationEvent::PeerSessionFailed(
                            "peer connection failed".to_string(),
                        ));
                    }
                })
            },
        ));

        Ok(Self { peer_connection })
    }
}

#[allow(clippy::needless_update)]
fn to_rtc_ice_server(server: &IceServer) -> RTCIceServer {
    RTCIceServer {
        urls: server.urls.clone(),
        username: server.username.clone().unwrap_or_default(),
        credential: server.credential.clone().unwrap_or_default(),
        ..Default::default()
    }
}

/// `{ "type": "...", "sdp": "..." }` into a parsed description
fn to_rtc_description(
    description: &SessionDescription,
    operation: &'static str,
) -> Result<RTCSessionDescription, PeerSessionError> {
    let value = description.as_value();
    let sdp = value
        .get("sdp")
        .and_then(Value::as_str)
        .ok_or_else(|| PeerSessionError::new(operation, "description has no sdp"))?
        .to_string();
    let parsed = match value.get("type").and_then(Value::as_str) {
        Some("offer") => RTCSessionDescription::offer(sdp),
        Some("answer") => RTCSessionDescription::answer(sdp),
        Some("pranswer") => RTCSessionDescription::pranswer(sdp),
        other => {
            return Err(PeerSessionError::new(
                operation,
                format!("unsupported description type {:?}", other),
            ))
        }
    };
    parsed.map_err(|e| PeerSessionError::new(operation, e))
}

fn codec_for(kind: TrackKind) -> RTCRtpCodecCapability {
    match kind {
        TrackKind::Video => RTCRtpCodecCapability {
            mime_type: "video/VP8".to_string(),
            clock_rate: 90000,
            channels: 0,
            sdp_fmtp_line: String::new(),
            rtcp_feedback: vec![],
        },
        TrackKind::Audio => RTCRtpCodecCapability {
            mime_type: "audio/opus".to_string(),
            clock_rate: 48000,
            channels: 2,
            sdp_fmtp_line: String::new(),
            rtcp_feedback: vec![],
        },
    }
}

#[async_trait]
impl PeerSession for WebRtcPeerSession {
    async fn create_offer(&self) -> Result<SessionDescription, PeerSessionError> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(|e| PeerSessionError::new("createOffer", e))?;
        let value =
            serde_json::to_value(&offer).map_err(|e| PeerSessionError::new("createOffer", e))?;
        Ok(SessionDescription::new(value))
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerSessionError> {
        let description = to_rtc_description(&description, "setLocalDescription")?;
        self.peer_connection
            .set_local_description(description)
            .await
            .map_err(|e| PeerSessionError::new("setLocalDescription", e))
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerSessionError> {
        let description = to_rtc_description(&description, "setRemoteDescription")?;
        self.peer_connection
            .set_remote_description(description)
            .await
            .map_err(|e| PeerSessionError::new("setRemoteDescription", e))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerSessionError> {
        let init: RTCIceCandidateInit = serde_json::from_value(candidate.into_value())
            .map_err(|e| PeerSessionError::new("addIceCandidate", e))?;
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(|e| PeerSessionError::new("addIceCandidate", e))
    }

    async fn add_track(
        &self,
        track: &MediaTrack,
        stream: &MediaStream,
    ) -> Result<(), PeerSessionError> {
        let local = Arc::new(TrackLocalStaticSample::new(
            codec_for(track.kind()),
            track.id().to_string(),
            stream.id().to_string(),
        ));
        self.peer_connection
            .add_track(local as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(|e| PeerSessionError::new("addTrack", e))?;
        debug!(track_id = track.id(), kind = ?track.kind(), "Track added to peer connection");
        Ok(())
    }

    async fn close(&self) -> Result<(), PeerSessionError> {
        self.peer_connection
            .close()
            .await
            .map_err(|e| PeerSessionError::new("close", e))
    }
}
