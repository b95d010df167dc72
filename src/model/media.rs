use crate::model::MediaError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// One captured track. Clones share the same live flag, so stopping any
/// handle stops the underlying capture.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    live: Arc<AtomicBool>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Stop capturing; idempotent
    pub fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            debug!(track_id = %self.id, kind = ?self.kind, "Track stopped");
        }
    }
}

/// A local media stream: the set of tracks produced by one acquisition
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn live_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

/// What the capture device is asked for. Video-only by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: false,
            width: 640,
            height: 480,
        }
    }
}

impl MediaConstraints {
    pub fn with_audio(mut self, audio: bool) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_video(mut self, video: bool) -> Self {
        self.video = video;
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn requests_any(&self) -> bool {
        self.video || self.audio
    }
}

/// Producer of local media streams
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaStream, MediaError>;
}

/// Consumer of the local stream, e.g. a preview surface
pub trait VideoSink: Send + Sync {
    fn attach(&self, stream: &MediaStream);
}

/// Sink that renders nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVideoSink;

impl VideoSink for NullVideoSink {
    fn attach(&self, stream: &MediaStream) {
        debug!(stream_id = %stream.id(), "Stream attached to null sink");
    }
}

/// Capture device that fabricates placeholder tracks for the requested kinds
#[derive(Debug, Default)]
pub struct SyntheticCaptureDevice {
    failure: Mutex<Option<MediaError>>,
}

impl SyntheticCaptureDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device whose every acquisition fails with `error`
    pub fn failing(error: MediaError) -> Self {
        Self {
            failure: Mutex::new(Some(error)),
        }
    }

    pub fn set_failure(&self, error: Option<MediaError>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = error;
        }
    }
}

#[async_trait]
impl CaptureDevice for SyntheticCaptureDevice {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaStream, MediaError> {
        let failure = self
            .failure
            .lock()
            .map_err(|e| MediaError::Other(e.to_string()))?
            .clone();
        if let Some(error) = failure {
            return Err(error);
        }
        if !constraints.requests_any() {
            return Err(MediaError::UnsupportedConstraints(
                "neither audio nor video requested".to_string(),
            ));
        }

        let mut tracks = Vec::new();
        if constraints.video {
            tracks.push(MediaTrack::new(TrackKind::Video));
        }
        if constraints.audio {
            tracks.push(MediaTrack::new(TrackKind::Audio));
        }
        let stream = MediaStream::new(tracks);
        info!(
            stream_id = %stream.id(),
            width = constraints.width,
            height = constraints.height,
            audio = constraints.audio,
            "Synthetic stream acquired"
        );
        Ok(stream)
    }
}
