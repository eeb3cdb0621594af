use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use ingest_session::sanitize_hwid;

use crate::ws::{run_echo_socket, run_ingest_socket, ServerState};

pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/echo", post(echo_body))
        .route("/ws", get(ingest_ws))
        .route("/ws/:hwid", get(ingest_ws_with_hwid))
        .route("/ws/echo", get(echo_ws))
        .with_state(state)
}

/// `GET /` — liveness hello.
async fn hello() -> &'static str {
    "hello"
}

/// `POST /echo` — reflects the request body verbatim.
async fn echo_body(body: axum::body::Bytes) -> impl IntoResponse {
    body
}

/// `GET /ws` — ingest without an hwid tag.
async fn ingest_ws(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_ingest_socket(socket, state, None))
}

/// `GET /ws/{hwid}` — ingest with an hwid tag sanitized from the URL path.
async fn ingest_ws_with_hwid(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
    Path(hwid): Path<String>,
) -> impl IntoResponse {
    let hwid = sanitize_hwid(&hwid);
    ws.on_upgrade(move |socket| run_ingest_socket(socket, state, hwid))
}

/// `GET /ws/echo` — reflect received binary/text messages verbatim.
async fn echo_ws(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(run_echo_socket)
}
