use futures_util::{SinkExt, StreamExt};
use rtc_signaling::config::ServerConfig;
use rtc_signaling::server::{serve, ServerState};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A relay bound to an ephemeral local port, shut down on drop
pub struct TestRelay {
    pub address: SocketAddr,
    pub state: ServerState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestRelay {
    pub async fn start(config: ServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let state = ServerState::from_config(&config);
        let (shutdown, signal) = oneshot::channel::<()>();
        tokio::spawn(serve(listener, state.clone(), async move {
            let _ = signal.await;
        }));
        Self {
            address,
            state,
            shutdown: Some(shutdown),
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.address)
    }

    pub async fn connect(&self) -> Socket {
        let (socket, _) = connect_async(self.url()).await.unwrap();
        socket
    }

    /// Wait until the registry holds exactly `count` open sessions
    pub async fn wait_for_sessions(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.state.registry.open_sessions().await != count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("sessions never reached the expected count");
    }

    /// Plain HTTP GET, returning the response body
    pub async fn get(&self, path: &str) -> String {
        let mut stream = TcpStream::connect(self.address).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
            .split_once("\r\n\r\n")
            .map(|(_, body)| body.to_string())
            .unwrap_or_default()
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub async fn send_json(socket: &mut Socket, value: &serde_json::Value) {
    socket.send(Message::text(value.to_string())).await.unwrap();
}

pub async fn send_text(socket: &mut Socket, text: &str) {
    socket.send(Message::text(text)).await.unwrap();
}

/// Next text frame as JSON, failing after two seconds
pub async fn recv_json(socket: &mut Socket) -> serde_json::Value {
    let message = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match socket.next().await {
                Some(Ok(message)) if message.is_text() => return message,
                Some(Ok(_)) => continue,
                other => panic!("socket ended: {other:?}"),
            }
        }
    })
    .await
    .expect("no message within two seconds");
    serde_json::from_str(message.to_text().unwrap()).unwrap()
}

/// True when nothing arrives within `wait`
pub async fn stays_silent(socket: &mut Socket, wait: Duration) -> bool {
    tokio::time::timeout(wait, socket.next()).await.is_err()
}
