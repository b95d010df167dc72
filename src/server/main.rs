use clap::Parser;
use rtc_signaling::config::{ServerConfig, TelemetryConfig, DEFAULT_MAX_FRAMES_PER_SESSION, DEFAULT_PORT};
use rtc_signaling::server::{init_telemetry, run, shutdown_telemetry, ServerError};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "rtc-signaling-server")]
#[command(version, about = "WebSocket relay for offer/answer/candidate signaling")]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "SIGNALING_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "SIGNALING_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory for recorded video-frame sessions (recording is off when unset)
    #[arg(long, env = "FRAMES_DIR")]
    frames_dir: Option<PathBuf>,

    /// Frames kept per session before newer ones are dropped
    #[arg(long, env = "MAX_FRAMES_PER_SESSION", default_value_t = DEFAULT_MAX_FRAMES_PER_SESSION)]
    max_frames: usize,

    /// Emit logs as JSON
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Jaeger collector endpoint, e.g. http://jaeger:14268/api/traces
    #[arg(long, env = "JAEGER_ENDPOINT")]
    jaeger_endpoint: Option<String>,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        let telemetry = TelemetryConfig {
            json: self.json_logs,
            jaeger_endpoint: self.jaeger_endpoint,
            ..TelemetryConfig::default()
        };
        let mut config = ServerConfig::default()
            .with_host(self.host)
            .with_port(self.port)
            .with_max_frames_per_session(self.max_frames)
            .with_telemetry(telemetry);
        if let Some(dir) = self.frames_dir {
            config = config.with_frames_dir(dir);
        }
        config
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let config = Cli::parse().into_config();
    init_telemetry(&config.telemetry)?;

    let telemetry = config.telemetry.clone();
    let result = run(config, shutdown_signal()).await;
    if let Err(e) = &result {
        error!(error = %e, "Server stopped with error");
    }
    shutdown_telemetry(&telemetry);
    result
}
