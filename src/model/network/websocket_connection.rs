use super::{ChannelState, NetworkError, SignalingMessage, Transport, TransportConnector};
use crate::model::negotiation::{EventQueue, NegotiationEvent};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::{Arc, RwLock};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens [`WebSocketConnection`]s with tokio-tungstenite
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait]
impl TransportConnector for WebSocketConnector {
    async fn connect(
        &self,
        url: &str,
        events: EventQueue,
    ) -> Result<Box<dyn Transport>, NetworkError> {
        let connection = WebSocketConnection::connect(url, events).await?;
        Ok(Box::new(connection))
    }
}

/// Signaling channel over one WebSocket. A writer task drains the outgoing
/// queue into the socket; a reader task forwards text frames to the event queue.
#[derive(Clone)]
pub struct WebSocketConnection {
    websocket_url: String,
    sender: UnboundedSender<Message>,
    state: Arc<RwLock<ChannelState>>,
}

impl WebSocketConnection {
    pub async fn connect(url: &str, events: EventQueue) -> Result<Self, NetworkError> {
        debug!(url, "Connecting to signaling server");
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| NetworkError::ConnectionRefused {
                address: url.to_string(),
                reason: e.to_string(),
            })?;
        info!(url, "Signaling channel open");

        let (write, read) = ws_stream.split();
        let (sender, receiver) = mpsc::unbounded_channel();
        let state = Arc::new(RwLock::new(ChannelState::Open));

        Self::spawn_send_task(write, receiver);
        Self::spawn_receive_task(read, events, state.clone());

        Ok(Self {
            websocket_url: url.to_string(),
            sender,
            state,
        })
    }

    fn spawn_send_task(
        mut write: SplitSink<WsStream, Message>,
        mut receiver: UnboundedReceiver<Message>,
    ) {
        tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                let closing = message.is_close();
                if let Err(e) = write.send(message).await {
                    error!(error = ?e, "Failed to send message");
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = write.close().await;
        });
    }

    fn spawn_receive_task(
        mut read: SplitStream<WsStream>,
        events: EventQueue,
        state: Arc<RwLock<ChannelState>>,
    ) {
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(message) if message.is_text() => match message.to_text() {
                        Ok(text) => {
                            events.push(NegotiationEvent::Message(text.to_string()));
                        }
                        Err(e) => warn!(error = ?e, "Dropping undecodable text frame"),
                    },
                    Ok(message) if message.is_close() => {
                        debug!("Signaling server closed the channel");
                        break;
                    }
                    Ok(message) if message.is_binary() => {
                        warn!("Ignoring binary frame on signaling channel");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = ?e, "Signaling channel read failed");
                        break;
                    }
                }
            }
            if let Ok(mut state) = state.write() {
                *state = ChannelState::Closed;
            }
            events.push(NegotiationEvent::ChannelClosed);
        });
    }
}

impl Transport for WebSocketConnection {
    fn send(&self, message: &SignalingMessage) {
        if self.state() != ChannelState::Open {
            warn!(kind = %message.kind(), "Channel not open, dropping message");
            return;
        }
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                error!(error = ?e, "Failed to serialize message");
                return;
            }
        };
        debug!(kind = %message.kind(), "Sending signaling message");
        if self.sender.send(Message::text(text)).is_err() {
            warn!(kind = %message.kind(), "Writer gone, dropping message");
        }
    }

    fn state(&self) -> ChannelState {
        self.state
            .read()
            .map(|state| *state)
            .unwrap_or(ChannelState::Closed)
    }

    fn close(&self) {
        let was_open = match self.state.write() {
            Ok(mut state) => {
                std::mem::replace(&mut *state, ChannelState::Closed) == ChannelState::Open
            }
            Err(_) => false,
        };
        if was_open {
            info!(url = %self.websocket_url, "Closing signaling channel");
            let _ = self.sender.send(Message::Close(None));
        }
    }
}
