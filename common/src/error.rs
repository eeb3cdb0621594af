use thiserror::Error;

/// A standard WebSocket close code, paired with the reason phrase the session
/// sends back to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseCode {
    pub code: u16,
    pub reason: &'static str,
}

impl CloseCode {
    pub const NORMAL: CloseCode = CloseCode { code: 1000, reason: "bye" };
    pub const INVALID_MESSAGE_TYPE: CloseCode = CloseCode { code: 1003, reason: "binary required" };
    pub const INVALID_HANDSHAKE: CloseCode = CloseCode { code: 1008, reason: "invalid handshake" };
    pub const INVALID_FRAME: CloseCode = CloseCode { code: 1008, reason: "invalid audio frame" };
    pub const FRAME_CODEC_MISMATCH: CloseCode =
        CloseCode { code: 1008, reason: "frame codec mismatch" };
    pub const INVALID_PAYLOAD_SIZE: CloseCode =
        CloseCode { code: 1008, reason: "frame payload size invalid" };
    pub const INTERNAL_ERROR: CloseCode = CloseCode { code: 1011, reason: "internal error" };
}

/// Errors raised while parsing or validating the ingest wire protocol.
///
/// Every variant here maps to a close code via [`IngestError::close_code`];
/// everything else (I/O, upload) either never reaches the caller or is
/// session-fatal without a specific close reason.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("handshake payload is malformed")]
    InvalidHandshake,

    #[error("frame payload is malformed")]
    InvalidFrame,

    #[error("frame magic does not match handshake codec")]
    FrameCodecMismatch,

    #[error("frame payload size does not match the negotiated frame layout")]
    InvalidPayloadSize,

    #[error("message type was not binary")]
    InvalidMessageType,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// The close code a protocol violation should be reported with, if any.
    /// `Io`/`Transport` errors have no specific close code — the connection
    /// is simply dropped.
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            IngestError::InvalidHandshake => Some(CloseCode::INVALID_HANDSHAKE),
            IngestError::InvalidFrame => Some(CloseCode::INVALID_FRAME),
            IngestError::FrameCodecMismatch => Some(CloseCode::FRAME_CODEC_MISMATCH),
            IngestError::InvalidPayloadSize => Some(CloseCode::INVALID_PAYLOAD_SIZE),
            IngestError::InvalidMessageType => Some(CloseCode::INVALID_MESSAGE_TYPE),
            IngestError::Transport(_) | IngestError::Io(_) => None,
        }
    }
}
