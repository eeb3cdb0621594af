use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use ingest_common::error::IngestError;
use ingest_session::reassemble::{MessageKind, Reassembler};
use ingest_session::{IngestSession, InboundMessage, SessionDeps, SessionOutcome};
use ingest_uploader::{NullUploader, ObjectUploader, S3Uploader, UploadConfig};

/// Shared, process-wide collaborators handed to every new connection.
#[derive(Clone)]
pub struct ServerState {
    pub uploader: Arc<dyn ObjectUploader>,
    pub upload_config: UploadConfig,
    pub data_dir: std::path::PathBuf,
    pub rotation_interval: Duration,
    pub clock: Arc<dyn ingest_session::Clock>,
}

impl ServerState {
    pub async fn new(
        data_dir: std::path::PathBuf,
        rotation_interval: Duration,
        upload_config: UploadConfig,
    ) -> ServerState {
        let uploader: Arc<dyn ObjectUploader> = if upload_config.enabled {
            Arc::new(S3Uploader::new(&upload_config).await)
        } else {
            Arc::new(NullUploader)
        };

        ServerState {
            uploader,
            upload_config,
            data_dir,
            rotation_interval,
            clock: Arc::new(ingest_session::SystemClock),
        }
    }

    fn session_deps(&self) -> SessionDeps {
        SessionDeps {
            clock: self.clock.clone(),
            uploader: self.uploader.clone(),
            upload_config: self.upload_config.clone(),
            project_root: self.data_dir.clone(),
            rotation_interval: self.rotation_interval,
        }
    }
}

/// Drives one upgraded ingest connection to completion: reassembles
/// fragments, feeds complete messages to an [`IngestSession`], and sends the
/// close frame the session decides on. Runs teardown on every exit path.
pub async fn run_ingest_socket(mut socket: WebSocket, state: ServerState, hwid: Option<String>) {
    let mut session = IngestSession::new(state.session_deps(), hwid);
    let mut reassembler = Reassembler::new();

    loop {
        let Some(received) = socket.recv().await else {
            break;
        };

        let message = match received {
            Ok(message) => message,
            Err(err) => {
                let transport_err = IngestError::Transport(err.to_string());
                log::warn!("{transport_err}, ending session");
                break;
            }
        };

        let inbound = match message {
            Message::Binary(bytes) => {
                match reassembler.push(MessageKind::Binary, &bytes, true) {
                    Some((_, complete)) => InboundMessage::Binary(complete),
                    None => continue,
                }
            }
            Message::Text(text) => {
                match reassembler.push(MessageKind::Text, text.as_bytes(), true) {
                    Some(_) => InboundMessage::Text(text),
                    None => continue,
                }
            }
            Message::Close(_) => InboundMessage::Close,
            // Ping/Pong are answered by axum automatically; nothing to do.
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        let outcome = session.handle_message(inbound).await;

        if let SessionOutcome::Close(close) = outcome {
            let frame = CloseFrame {
                code: close.code,
                reason: close.reason.into(),
            };
            let _ = socket.send(Message::Close(Some(frame))).await;
            break;
        }
    }

    session.teardown().await;
}

/// `/ws/echo` — reflects binary and text messages verbatim. No ingest
/// semantics; out of scope for this spec's core.
pub async fn run_echo_socket(mut socket: WebSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Binary(bytes) => {
                if socket.send(Message::Binary(bytes)).await.is_err() {
                    break;
                }
            }
            Message::Text(text) => {
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}
