use crate::model::NegotiationError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationState {
    Idle,
    AcquiringMedia,
    CreatingOffer,
    AwaitingAnswer,
    Negotiated,
    Failed,
    Closed,
}

impl NegotiationState {
    /// No further transition happens without an external `start`/`stop`
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            NegotiationState::Negotiated | NegotiationState::Failed | NegotiationState::Closed
        )
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationState::Idle => "IDLE",
            NegotiationState::AcquiringMedia => "ACQUIRING_MEDIA",
            NegotiationState::CreatingOffer => "CREATING_OFFER",
            NegotiationState::AwaitingAnswer => "AWAITING_ANSWER",
            NegotiationState::Negotiated => "NEGOTIATED",
            NegotiationState::Failed => "FAILED",
            NegotiationState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Snapshot published to subscribers after every transition
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationStatus {
    pub state: NegotiationState,
    pub last_error: Option<NegotiationError>,
}

impl NegotiationStatus {
    /// Single human-readable line for a UI
    pub fn status_line(&self) -> String {
        match (&self.last_error, self.state) {
            (Some(error), _) => error.status().to_string(),
            (None, NegotiationState::Idle) => "idle".to_string(),
            (None, NegotiationState::AcquiringMedia) => "starting camera".to_string(),
            (None, NegotiationState::CreatingOffer) => "creating offer".to_string(),
            (None, NegotiationState::AwaitingAnswer) => "waiting for remote peer".to_string(),
            (None, NegotiationState::Negotiated) => "connected".to_string(),
            (None, NegotiationState::Failed) => "failed".to_string(),
            (None, NegotiationState::Closed) => "closed".to_string(),
        }
    }
}

impl Default for NegotiationStatus {
    fn default() -> Self {
        Self {
            state: NegotiationState::Idle,
            last_error: None,
        }
    }
}
