use serde::{Deserialize, Serialize};

/// Google's public STUN server, the single server used when nothing else is configured
pub const DEFAULT_STUN_URL: &str = "stun:stun.l.google.com:19302";

/// ICE server entry handed to the Peer Session at creation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServer {
    /// Server URLs (can have multiple for failover)
    pub urls: Vec<String>,
    /// Username for authentication (required for TURN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Credential for authentication (required for TURN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    /// Create a STUN server configuration
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }

    /// Create a TURN server configuration with authentication
    pub fn turn(
        url: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self::stun(url).with_auth(username, credential)
    }

    pub fn from_urls(urls: Vec<String>) -> Self {
        Self {
            urls,
            username: None,
            credential: None,
        }
    }

    pub fn with_auth(mut self, username: impl Into<String>, credential: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.credential = Some(credential.into());
        self
    }

    /// The fixed list used by default: one public STUN server
    pub fn default_stun_servers() -> Vec<Self> {
        vec![Self::stun(DEFAULT_STUN_URL)]
    }
}
