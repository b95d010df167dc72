use crate::model::{SessionId, SessionState};
use axum::extract::ws::Message;
use tokio::sync::mpsc::UnboundedSender;

/// Outgoing half of one relay session: everything pushed into `sender` is
/// written to the socket in order by the session's writer task.
#[derive(Debug, Clone)]
pub struct Connection {
    pub session_id: SessionId,
    pub sender: UnboundedSender<Message>,
    pub state: SessionState,
}

impl Connection {
    pub fn new(session_id: SessionId, sender: UnboundedSender<Message>) -> Self {
        Self {
            session_id,
            sender,
            state: SessionState::Open,
        }
    }

    /// Enqueue a text frame; false when the writer is gone
    pub fn send_text(&self, text: &str) -> bool {
        self.sender.send(Message::Text(text.to_string())).is_ok()
    }
}
