#![allow(dead_code)]

#[cfg(feature = "server")]
pub mod relay;

use async_trait::async_trait;
use rtc_signaling::config::ClientConfig;
use rtc_signaling::model::{
    CaptureDevice, ChannelState, EventQueue, IceCandidate, IceServer, MediaConstraints,
    MediaError, MediaStream, MediaTrack, NegotiationEvent, Negotiator, NegotiatorDeps,
    NetworkError, NullVideoSink, PeerSession, PeerSessionError, PeerSessionFactory, RetryPolicy,
    SessionDescription, SignalingMessage, SyntheticCaptureDevice, Transport, TransportConnector,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Peer-session calls in the order they were made
#[derive(Debug, Clone, PartialEq)]
pub enum PeerCall {
    AddTrack(String),
    CreateOffer,
    SetLocal,
    SetRemote,
    AddCandidate(IceCandidate),
    Close,
}

#[derive(Default)]
pub struct PeerLog {
    pub calls: Mutex<Vec<PeerCall>>,
    pub closed: AtomicBool,
}

impl PeerLog {
    pub fn calls(&self) -> Vec<PeerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn applied_candidates(&self) -> Vec<IceCandidate> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PeerCall::AddCandidate(candidate) => Some(candidate),
                _ => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: PeerCall) {
        self.calls.lock().unwrap().push(call);
    }
}

pub struct RecordingPeerSession {
    log: Arc<PeerLog>,
}

#[async_trait]
impl PeerSession for RecordingPeerSession {
    async fn create_offer(&self) -> Result<SessionDescription, PeerSessionError> {
        self.log.record(PeerCall::CreateOffer);
        Ok(SessionDescription::new(
            json!({ "type": "offer", "sdp": "v=0\r\nm=video 9 UDP/TLS/RTP/SAVPF 96\r\n" }),
        ))
    }

    async fn set_local_description(
        &self,
        _description: SessionDescription,
    ) -> Result<(), PeerSessionError> {
        self.log.record(PeerCall::SetLocal);
        Ok(())
    }

    async fn set_remote_description(
        &self,
        _description: SessionDescription,
    ) -> Result<(), PeerSessionError> {
        self.log.record(PeerCall::SetRemote);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerSessionError> {
        self.log.record(PeerCall::AddCandidate(candidate));
        Ok(())
    }

    async fn add_track(
        &self,
        track: &MediaTrack,
        _stream: &MediaStream,
    ) -> Result<(), PeerSessionError> {
        self.log.record(PeerCall::AddTrack(track.id().to_string()));
        Ok(())
    }

    async fn close(&self) -> Result<(), PeerSessionError> {
        self.log.record(PeerCall::Close);
        self.log.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockPeerSessionFactory {
    pub log: Arc<PeerLog>,
    pub created: AtomicU32,
    events: Mutex<Option<EventQueue>>,
}

impl MockPeerSessionFactory {
    /// The queue the latest peer session reports through
    pub fn events(&self) -> EventQueue {
        self.events
            .lock()
            .unwrap()
            .clone()
            .expect("no peer session created")
    }

    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerSessionFactory for MockPeerSessionFactory {
    async fn create(
        &self,
        _ice_servers: &[IceServer],
        events: EventQueue,
    ) -> Result<Box<dyn PeerSession>, PeerSessionError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.events.lock().unwrap() = Some(events);
        Ok(Box::new(RecordingPeerSession {
            log: self.log.clone(),
        }))
    }
}

#[derive(Default)]
pub struct Wire {
    pub sent: Mutex<Vec<SignalingMessage>>,
    pub closed: AtomicBool,
}

struct MockTransport(Arc<Wire>);

impl Transport for MockTransport {
    fn send(&self, message: &SignalingMessage) {
        if !self.0.closed.load(Ordering::SeqCst) {
            self.0.sent.lock().unwrap().push(message.clone());
        }
    }

    fn state(&self) -> ChannelState {
        if self.0.closed.load(Ordering::SeqCst) {
            ChannelState::Closed
        } else {
            ChannelState::Open
        }
    }

    fn close(&self) {
        self.0.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector that refuses the first `failures` attempts
#[derive(Default)]
pub struct MockConnector {
    pub wire: Arc<Wire>,
    pub attempts: AtomicU32,
    failures: AtomicU32,
    events: Mutex<Option<EventQueue>>,
}

impl MockConnector {
    pub fn failing(failures: u32) -> Self {
        Self {
            failures: AtomicU32::new(failures),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SignalingMessage> {
        self.wire.sent.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.wire.closed.load(Ordering::SeqCst)
    }

    /// Deliver a text frame as if it came from the relay
    pub fn deliver(&self, message: serde_json::Value) {
        self.push(NegotiationEvent::Message(message.to_string()));
    }

    pub fn push(&self, event: NegotiationEvent) {
        let events = self.events.lock().unwrap().clone().expect("not connected");
        events.push(event);
    }
}

#[async_trait]
impl TransportConnector for MockConnector {
    async fn connect(
        &self,
        url: &str,
        events: EventQueue,
    ) -> Result<Box<dyn Transport>, NetworkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(NetworkError::ConnectionRefused {
                address: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        *self.events.lock().unwrap() = Some(events);
        Ok(Box::new(MockTransport(self.wire.clone())))
    }
}

/// Keeps a handle on every stream it hands out
#[derive(Default)]
pub struct TrackingCaptureDevice {
    inner: SyntheticCaptureDevice,
    pub streams: Mutex<Vec<MediaStream>>,
}

impl TrackingCaptureDevice {
    pub fn failing(error: MediaError) -> Self {
        Self {
            inner: SyntheticCaptureDevice::failing(error),
            streams: Mutex::default(),
        }
    }

    pub fn acquisitions(&self) -> usize {
        self.streams.lock().unwrap().len()
    }

    pub fn live_tracks(&self) -> usize {
        self.streams
            .lock()
            .unwrap()
            .iter()
            .map(MediaStream::live_tracks)
            .sum()
    }
}

#[async_trait]
impl CaptureDevice for TrackingCaptureDevice {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaStream, MediaError> {
        let stream = self.inner.acquire(constraints).await?;
        self.streams.lock().unwrap().push(stream.clone());
        Ok(stream)
    }
}

pub struct Harness {
    pub negotiator: Negotiator,
    pub capture: Arc<TrackingCaptureDevice>,
    pub peers: Arc<MockPeerSessionFactory>,
    pub connector: Arc<MockConnector>,
}

impl Harness {
    pub fn new(connector: MockConnector) -> Self {
        Self::with(connector, TrackingCaptureDevice::default(), test_config())
    }

    pub fn with(
        connector: MockConnector,
        capture: TrackingCaptureDevice,
        config: ClientConfig,
    ) -> Self {
        let capture = Arc::new(capture);
        let peers = Arc::new(MockPeerSessionFactory::default());
        let connector = Arc::new(connector);
        let negotiator = Negotiator::spawn(
            config,
            NegotiatorDeps {
                capture: capture.clone(),
                sink: Arc::new(NullVideoSink),
                peers: peers.clone(),
                connector: connector.clone(),
            },
        );
        Self {
            negotiator,
            capture,
            peers,
            connector,
        }
    }

    /// True once the stream, the peer session and the channel are all released
    pub fn released(&self) -> bool {
        self.capture.live_tracks() == 0
            && (self.peers.created() == 0 || self.peers.log.is_closed())
            && (self.capture.acquisitions() == 0 || self.connector.is_closed())
    }
}

pub fn test_config() -> ClientConfig {
    ClientConfig::new("ws://relay.test")
        .with_retry(RetryPolicy::fixed(3, Duration::from_secs(2)))
        .with_connect_timeout(Duration::from_secs(5))
        .with_answer_timeout(Duration::from_secs(30))
}

pub fn candidate(n: u32) -> serde_json::Value {
    json!({
        "candidate": format!("candidate:{n} 1 udp 2122260223 10.0.0.{n} 5000{n} typ host"),
        "sdpMid": "0",
        "sdpMLineIndex": 0
    })
}

pub fn answer() -> serde_json::Value {
    json!({ "type": "answer", "answer": { "type": "answer", "sdp": "v=0\r\n" } })
}
