use crate::model::MessageError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Type tag of the raw frame messages sent by the frame-relay client variant
pub const VIDEO_FRAME_TYPE: &str = "video-frame";

/// Session description produced by the Peer Session; routed as an opaque blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionDescription(Value);

impl SessionDescription {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// ICE candidate descriptor; routed as an opaque blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IceCandidate(Value);

impl IceCandidate {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalingKind {
    Offer,
    Answer,
    Candidate,
}

impl SignalingKind {
    pub fn from_type(value: &str) -> Option<Self> {
        match value {
            "offer" => Some(SignalingKind::Offer),
            "answer" => Some(SignalingKind::Answer),
            "candidate" => Some(SignalingKind::Candidate),
            _ => None,
        }
    }

    /// Wire value of the `type` field; the payload lives under the same key
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalingKind::Offer => "offer",
            SignalingKind::Answer => "answer",
            SignalingKind::Candidate => "candidate",
        }
    }
}

impl fmt::Display for SignalingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One negotiation message as it travels over the Transport Channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalingMessage {
    Offer { offer: SessionDescription },
    Answer { answer: SessionDescription },
    Candidate { candidate: IceCandidate },
}

impl SignalingMessage {
    /// Parse a text frame, telling apart unknown types from known types
    /// without their payload. A `null` payload counts as absent.
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        let mut fields = decode_object(text)?;
        let kind = type_tag(&fields)?;
        Self::from_fields(kind, &mut fields)
    }

    fn from_fields(kind: String, fields: &mut Map<String, Value>) -> Result<Self, MessageError> {
        let kind = SignalingKind::from_type(&kind).ok_or(MessageError::UnknownType(kind))?;
        match fields.remove(kind.as_str()) {
            None | Some(Value::Null) => Err(MessageError::MissingPayload {
                kind: kind.to_string(),
            }),
            Some(payload) => Ok(Self::from_parts(kind, payload)),
        }
    }

    pub fn from_parts(kind: SignalingKind, payload: Value) -> Self {
        match kind {
            SignalingKind::Offer => SignalingMessage::Offer {
                offer: SessionDescription(payload),
            },
            SignalingKind::Answer => SignalingMessage::Answer {
                answer: SessionDescription(payload),
            },
            SignalingKind::Candidate => SignalingMessage::Candidate {
                candidate: IceCandidate(payload),
            },
        }
    }

    pub fn kind(&self) -> SignalingKind {
        match self {
            SignalingMessage::Offer { .. } => SignalingKind::Offer,
            SignalingMessage::Answer { .. } => SignalingKind::Answer,
            SignalingMessage::Candidate { .. } => SignalingKind::Candidate,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// `{ "type": "video-frame", "data": "<hex>" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFrameMessage {
    pub data: String,
}

impl VideoFrameMessage {
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        let mut fields = decode_object(text)?;
        Self::from_fields(&mut fields)
    }

    fn from_fields(fields: &mut Map<String, Value>) -> Result<Self, MessageError> {
        match fields.remove("data") {
            Some(Value::String(data)) => Ok(Self { data }),
            _ => Err(MessageError::MissingPayload {
                kind: VIDEO_FRAME_TYPE.to_string(),
            }),
        }
    }
}

/// Anything a client may send to the relay
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Signaling(SignalingMessage),
    VideoFrame(VideoFrameMessage),
}

impl InboundMessage {
    /// Decodes the frame once and dispatches on its `type`
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        let mut fields = decode_object(text)?;
        let kind = type_tag(&fields)?;
        if kind == VIDEO_FRAME_TYPE {
            return VideoFrameMessage::from_fields(&mut fields).map(InboundMessage::VideoFrame);
        }
        SignalingMessage::from_fields(kind, &mut fields).map(InboundMessage::Signaling)
    }
}

fn decode_object(text: &str) -> Result<Map<String, Value>, MessageError> {
    match serde_json::from_str(text) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(MessageError::NotAnObject),
        Err(e) => Err(MessageError::InvalidJson(e.to_string())),
    }
}

fn type_tag(fields: &Map<String, Value>) -> Result<String, MessageError> {
    match fields.get("type") {
        Some(Value::String(kind)) => Ok(kind.clone()),
        _ => Err(MessageError::MissingType),
    }
}
