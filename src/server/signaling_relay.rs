use super::{FrameRecorder, SessionRegistry};
use crate::model::{
    InboundMessage, MessageError, SessionId, SignalingKind, VideoFrameMessage, VIDEO_FRAME_TYPE,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Relayed {
        kind: SignalingKind,
        recipients: usize,
    },
    /// A `video-frame` for the recorder; `kept` is false once the session's
    /// buffer is full
    Recorded { kept: bool },
    Dropped(MessageError),
}

/// Routes inbound messages of one session to the others.
///
/// Every known kind is broadcast to all other open sessions. This is only
/// correct with exactly two participants: a third session receives
/// negotiation traffic meant for someone else.
pub struct SignalingRelay {
    registry: Arc<dyn SessionRegistry>,
    recorder: Option<FrameRecorder>,
}

impl SignalingRelay {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self {
            registry,
            recorder: None,
        }
    }

    pub fn with_recorder(mut self, recorder: FrameRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn registry(&self) -> &Arc<dyn SessionRegistry> {
        &self.registry
    }

    /// Never fails: malformed or unknown messages are logged and dropped
    #[instrument(skip(self, text))]
    pub async fn route(&self, sender: SessionId, text: &str) -> RouteOutcome {
        let message = match InboundMessage::parse(text) {
            Ok(InboundMessage::Signaling(message)) => message,
            Ok(InboundMessage::VideoFrame(frame)) => return self.record(sender, frame).await,
            Err(e) => {
                warn!(error = %e, status = e.status(), "Dropping signaling message");
                return RouteOutcome::Dropped(e);
            }
        };
        let kind = message.kind();
        let forwarded = match message.to_json() {
            Ok(forwarded) => forwarded,
            Err(e) => {
                error!(error = ?e, "Failed to serialize message");
                return RouteOutcome::Dropped(MessageError::InvalidJson(e.to_string()));
            }
        };

        let recipients = self.registry.broadcast_except(sender, &forwarded).await;
        info!(%kind, recipients, "Relayed signaling message");
        RouteOutcome::Relayed { kind, recipients }
    }

    async fn record(&self, sender: SessionId, frame: VideoFrameMessage) -> RouteOutcome {
        let Some(recorder) = &self.recorder else {
            let error = MessageError::UnknownType(VIDEO_FRAME_TYPE.to_string());
            warn!(error = %error, "Frame recording disabled, dropping frame");
            return RouteOutcome::Dropped(error);
        };
        let kept = recorder.record(sender, frame.data).await;
        RouteOutcome::Recorded { kept }
    }

    /// Persist whatever the session recorded
    pub async fn session_closed(&self, session_id: SessionId) {
        if let Some(recorder) = &self.recorder {
            if recorder.flush(session_id).await.is_some() {
                debug!(%session_id, "Frame flush scheduled");
            }
        }
    }

    pub fn recorder(&self) -> Option<&FrameRecorder> {
        self.recorder.as_ref()
    }
}
