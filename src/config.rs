use crate::model::{IceServer, MediaConstraints, RetryPolicy};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SIGNALING_URL: &str = "ws://localhost:3000";
pub const DEFAULT_LOG_FILTER: &str = "rtc_signaling=debug,tower_http=debug,warn";
pub const DEFAULT_MAX_FRAMES_PER_SESSION: usize = 1000;

/// Logging and trace export settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    pub json: bool,
    /// Jaeger collector endpoint; export is off when absent
    pub jaeger_endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
            jaeger_endpoint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Where recorded `video-frame` sessions are written; recording is off when absent
    pub frames_dir: Option<PathBuf>,
    pub max_frames_per_session: usize,
    pub telemetry: TelemetryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            frames_dir: None,
            max_frames_per_session: DEFAULT_MAX_FRAMES_PER_SESSION,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_frames_dir(mut self, frames_dir: impl Into<PathBuf>) -> Self {
        self.frames_dir = Some(frames_dir.into());
        self
    }

    pub fn with_max_frames_per_session(mut self, max: usize) -> Self {
        self.max_frames_per_session = max;
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }
}

/// Everything one offering negotiation needs to know up front
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub signaling_url: String,
    pub ice_servers: Vec<IceServer>,
    pub media: MediaConstraints,
    pub retry: RetryPolicy,
    /// Bound on a single connection attempt
    pub connect_timeout: Duration,
    /// Bound on AWAITING_ANSWER
    pub answer_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            signaling_url: DEFAULT_SIGNALING_URL.to_string(),
            ice_servers: IceServer::default_stun_servers(),
            media: MediaConstraints::default(),
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(5),
            answer_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn new(signaling_url: impl Into<String>) -> Self {
        Self {
            signaling_url: signaling_url.into(),
            ..Self::default()
        }
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<IceServer>) -> Self {
        self.ice_servers = ice_servers;
        self
    }

    pub fn with_media(mut self, media: MediaConstraints) -> Self {
        self.media = media;
        self
    }

    pub fn with_audio(mut self, audio: bool) -> Self {
        self.media = self.media.with_audio(audio);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_answer_timeout(mut self, timeout: Duration) -> Self {
        self.answer_timeout = timeout;
        self
    }
}
