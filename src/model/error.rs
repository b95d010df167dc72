use std::time::Duration;
use thiserror::Error;

/// Why a capture device could not produce a local stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Permission to use the capture device was denied")]
    PermissionDenied,
    #[error("Capture device is busy")]
    DeviceBusy,
    #[error("No capture device found")]
    NotFound,
    #[error("Constraints cannot be satisfied: {0}")]
    UnsupportedConstraints(String),
    #[error("Capture failed: {0}")]
    Other(String),
}

/// Failure reported by the platform peer-connection capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} failed: {reason}")]
pub struct PeerSessionError {
    pub operation: &'static str,
    pub reason: String,
}

impl PeerSessionError {
    pub fn new(operation: &'static str, reason: impl ToString) -> Self {
        Self {
            operation,
            reason: reason.to_string(),
        }
    }
}

/// A signaling message that cannot be routed or applied; always dropped, never fatal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Message is not a JSON object")]
    NotAnObject,
    #[error("Message has no type")]
    MissingType,
    #[error("Unknown message type: {0}")]
    UnknownType(String),
    #[error("Message of type {kind} has no {kind} payload")]
    MissingPayload { kind: String },
}

impl MessageError {
    pub fn status(&self) -> &'static str {
        "malformed signaling message ignored"
    }
}

/// Errors surfaced by the negotiation state machine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NegotiationError {
    #[error("Media acquisition failed: {0}")]
    MediaAcquisition(#[from] MediaError),

    #[error("Signaling server {url} unreachable after {attempts} attempt(s): {reason}")]
    SignalingUnreachable {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("No answer received within {0:?}")]
    NegotiationTimeout(Duration),

    #[error("Peer session error: {0}")]
    PeerSession(#[from] PeerSessionError),

    #[error("Cannot start negotiation in state {0}")]
    InvalidState(crate::model::NegotiationState),
}

impl NegotiationError {
    /// Human-readable status line for the error kind
    pub fn status(&self) -> &'static str {
        match self {
            NegotiationError::MediaAcquisition(_) => "camera unavailable",
            NegotiationError::SignalingUnreachable { .. } => "signaling server unreachable",
            NegotiationError::NegotiationTimeout(_) => "remote peer did not answer",
            NegotiationError::PeerSession(_) => "peer connection failed",
            NegotiationError::InvalidState(_) => "negotiation already started",
        }
    }
}
