use crate::model::SessionId;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

#[derive(Error, Debug)]
pub enum FrameStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One raw frame as received, stamped with its arrival time in epoch milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub timestamp: i64,
    pub data: String,
}

/// File contents written for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecording {
    pub session_id: SessionId,
    pub frames: Vec<RecordedFrame>,
}

#[async_trait]
pub trait FrameStore: Send + Sync {
    async fn save(
        &self,
        session_id: SessionId,
        frames: Vec<RecordedFrame>,
    ) -> Result<PathBuf, FrameStoreError>;
}

/// Writes `session_<id>_<epoch-ms>.json` into a directory
#[derive(Debug, Clone)]
pub struct JsonFileFrameStore {
    dir: PathBuf,
}

impl JsonFileFrameStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FrameStore for JsonFileFrameStore {
    #[instrument(skip(self, frames), fields(frames = frames.len()))]
    async fn save(
        &self,
        session_id: SessionId,
        frames: Vec<RecordedFrame>,
    ) -> Result<PathBuf, FrameStoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!(
            "session_{}_{}.json",
            session_id,
            Utc::now().timestamp_millis()
        ));
        let recording = SessionRecording { session_id, frames };
        let contents = serde_json::to_vec_pretty(&recording)?;
        tokio::fs::write(&path, contents).await?;
        info!(path = %path.display(), "Session frames saved");
        Ok(path)
    }
}

/// Buffers `video-frame` payloads per session and hands them to a
/// [`FrameStore`] when the session ends
pub struct FrameRecorder {
    store: Arc<dyn FrameStore>,
    max_frames: usize,
    buffers: Mutex<HashMap<SessionId, Vec<RecordedFrame>>>,
}

impl FrameRecorder {
    pub fn new(store: Arc<dyn FrameStore>, max_frames: usize) -> Self {
        Self {
            store,
            max_frames,
            buffers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns false when the session's buffer is full and the frame was dropped
    pub async fn record(&self, session_id: SessionId, data: String) -> bool {
        let mut buffers = self.buffers.lock().await;
        let frames = buffers.entry(session_id).or_default();
        if frames.len() >= self.max_frames {
            debug!(%session_id, max = self.max_frames, "Frame buffer full, dropping frame");
            return false;
        }
        frames.push(RecordedFrame {
            timestamp: Utc::now().timestamp_millis(),
            data,
        });
        true
    }

    pub async fn buffered(&self, session_id: SessionId) -> usize {
        let buffers = self.buffers.lock().await;
        buffers.get(&session_id).map_or(0, Vec::len)
    }

    /// Hand the session's frames to the store on a background task. Failures
    /// are logged only. Nothing is spawned for a session without frames.
    pub async fn flush(&self, session_id: SessionId) -> Option<JoinHandle<()>> {
        let frames = self.buffers.lock().await.remove(&session_id)?;
        if frames.is_empty() {
            return None;
        }
        let store = self.store.clone();
        Some(tokio::spawn(async move {
            let count = frames.len();
            if let Err(e) = store.save(session_id, frames).await {
                error!(%session_id, count, error = %e, "Failed to save session frames");
            }
        }))
    }
}
