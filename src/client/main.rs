use clap::Parser;
use rtc_signaling::config::{ClientConfig, DEFAULT_SIGNALING_URL};
use rtc_signaling::model::{
    IceServer, NegotiationState, Negotiator, NegotiatorDeps, NullVideoSink, RetryPolicy,
    SyntheticCaptureDevice, WebRtcPeerSessionFactory, WebSocketConnector,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "rtc-signaling-client")]
#[command(version, about = "Offer a synthetic camera stream over a signaling relay")]
struct Cli {
    /// Signaling relay URL
    #[arg(short, long, env = "SIGNALING_URL", default_value = DEFAULT_SIGNALING_URL)]
    url: String,

    /// Also offer an audio track
    #[arg(long)]
    audio: bool,

    /// Seconds to wait for the remote answer
    #[arg(long, default_value_t = 30)]
    answer_timeout: u64,

    /// Connection attempts before giving up
    #[arg(long, default_value_t = 3)]
    attempts: u32,

    /// Additional TURN server (turn:host:port)
    #[arg(long)]
    turn_server: Option<String>,

    #[arg(long, requires = "turn_server")]
    turn_username: Option<String>,

    #[arg(long, requires = "turn_server")]
    turn_credential: Option<String>,
}

impl Cli {
    fn into_config(self) -> ClientConfig {
        let mut ice_servers = IceServer::default_stun_servers();
        if let Some(url) = self.turn_server {
            let server = match (self.turn_username, self.turn_credential) {
                (Some(username), Some(credential)) => IceServer::turn(url, username, credential),
                _ => IceServer::from_urls(vec![url]),
            };
            ice_servers.push(server);
        }
        ClientConfig::new(self.url)
            .with_audio(self.audio)
            .with_ice_servers(ice_servers)
            .with_retry(RetryPolicy {
                max_attempts: self.attempts,
                ..RetryPolicy::default()
            })
            .with_answer_timeout(Duration::from_secs(self.answer_timeout))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config();
    info!(url = %config.signaling_url, "Starting negotiation");

    let negotiator = Negotiator::spawn(
        config,
        NegotiatorDeps {
            capture: Arc::new(SyntheticCaptureDevice::new()),
            sink: Arc::new(NullVideoSink),
            peers: Arc::new(WebRtcPeerSessionFactory),
            connector: Arc::new(WebSocketConnector),
        },
    );

    let mut updates = negotiator.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let status = updates.borrow_and_update().clone();
            info!(state = %status.state, status = %status.status_line(), "Status");
        }
    });

    if let Err(e) = negotiator.start().await {
        warn!(error = %e, status = e.status(), "Negotiation could not start");
        return;
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        status = negotiator.settled() => {
            if status.state == NegotiationState::Negotiated {
                info!("Negotiated, press Ctrl-C to hang up");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    negotiator.stop().await;
    info!(state = %negotiator.state(), "Stopped");
}
