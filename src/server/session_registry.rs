use super::Connection;
use crate::model::{SessionId, SessionState};
use async_trait::async_trait;
use axum::extract::ws::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Server-side map of live sessions. Every operation is atomic with respect
/// to the others.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Store a new OPEN session around `sender` and return its fresh id
    async fn register(&self, sender: UnboundedSender<Message>) -> SessionId;

    /// Idempotent; returns whether an entry was removed
    async fn unregister(&self, session_id: SessionId) -> bool;

    async fn set_state(&self, session_id: SessionId, state: SessionState);

    /// Deliver `text` to every OPEN session except `sender_id`; returns the
    /// number of sessions it was handed to
    async fn broadcast_except(&self, sender_id: SessionId, text: &str) -> usize;

    async fn open_sessions(&self) -> usize;
}

#[derive(Debug, Clone, Default)]
pub struct MemorySessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, Connection>>>,
}

impl MemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRegistry for MemorySessionRegistry {
    #[instrument(skip(self, sender))]
    async fn register(&self, sender: UnboundedSender<Message>) -> SessionId {
        let session_id = SessionId::new();
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, Connection::new(session_id, sender));
        info!(%session_id, total = sessions.len(), "Session registered");
        session_id
    }

    #[instrument(skip(self))]
    async fn unregister(&self, session_id: SessionId) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(&session_id).is_some();
        if removed {
            info!(%session_id, total = sessions.len(), "Session unregistered");
        } else {
            debug!(%session_id, "Session already gone");
        }
        removed
    }

    #[instrument(skip(self))]
    async fn set_state(&self, session_id: SessionId, state: SessionState) {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session_id) {
            Some(connection) => {
                debug!(%session_id, from = ?connection.state, to = ?state, "Session state changed");
                connection.state = state;
            }
            None => debug!(%session_id, "State change for unknown session ignored"),
        }
    }

    // The read guard is held for the whole fan-out: removal waits for it,
    // so a broadcast sees one consistent member set. Sends never block.
    #[instrument(skip(self, text))]
    async fn broadcast_except(&self, sender_id: SessionId, text: &str) -> usize {
        let sessions = self.sessions.read().await;
        let mut delivered = 0;
        for (session_id, connection) in sessions.iter() {
            if *session_id == sender_id {
                continue;
            }
            if !connection.state.is_open() {
                debug!(%session_id, state = ?connection.state, "Skipping session that is not open");
                continue;
            }
            if connection.send_text(text) {
                delivered += 1;
            } else {
                warn!(%session_id, "Writer gone, message not delivered");
            }
        }
        debug!(delivered, "Broadcast complete");
        delivered
    }

    async fn open_sessions(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.values().filter(|c| c.state.is_open()).count()
    }
}
