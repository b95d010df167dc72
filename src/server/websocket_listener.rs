use super::ServerState;
use crate::model::{SessionId, SessionState};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error, info, instrument, warn};

#[instrument(skip(ws, state))]
pub async fn handle_websocket(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
) -> impl IntoResponse {
    debug!("New WebSocket upgrade request");
    ws.on_upgrade(move |socket| listen(socket, state))
}

/// Serve one session until either side of the socket ends
#[instrument(skip(socket, state), fields(session_id))]
async fn listen(socket: WebSocket, state: ServerState) {
    let (ws_sender, ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let session_id = state.registry.register(tx).await;
    tracing::Span::current().record("session_id", tracing::field::display(session_id));

    let sender_task = handle_outgoing_messages(rx, ws_sender);
    let receiver_task = handle_incoming_messages(ws_receiver, session_id, &state);

    tokio::select! {
        _ = sender_task => {
            info!(%session_id, "Sender task completed");
        }
        _ = receiver_task => {
            info!(%session_id, "Receiver task completed");
        }
    }

    state
        .registry
        .set_state(session_id, SessionState::Closing)
        .await;
    state.relay.session_closed(session_id).await;
    state.registry.unregister(session_id).await;
}

#[instrument(skip(rx, ws_sender))]
pub async fn handle_outgoing_messages(
    mut rx: UnboundedReceiver<Message>,
    mut ws_sender: SplitSink<WebSocket, Message>,
) {
    debug!("Started handling outgoing messages");
    while let Some(msg) = rx.recv().await {
        if let Err(e) = ws_sender.send(msg).await {
            error!(error = ?e, "Failed to send message");
            break;
        }
    }
}

#[instrument(skip(receiver, state))]
pub async fn handle_incoming_messages(
    mut receiver: SplitStream<WebSocket>,
    session_id: SessionId,
    state: &ServerState,
) {
    debug!("Started handling incoming messages");
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                state.relay.route(session_id, &text).await;
            }
            Ok(Message::Close(_)) => {
                info!(%session_id, "Client disconnected");
                break;
            }
            Ok(Message::Binary(data)) => {
                warn!(%session_id, len = data.len(), "Ignoring binary frame");
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = ?e, "Failed to receive message");
                break;
            }
        }
    }
}
