use super::websocket_listener::handle_websocket;
use super::ServerState;
use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

/// `GET /` upgrades to the signaling socket, `GET /health` reports liveness
pub fn create_signaling_route(state: ServerState) -> Router {
    Router::new()
        .route("/", get(handle_websocket))
        .route("/health", get(health))
        .with_state(state)
}

async fn health(State(state): State<ServerState>) -> Json<Value> {
    let sessions = state.registry.open_sessions().await;
    Json(json!({ "status": "ok", "sessions": sessions }))
}
