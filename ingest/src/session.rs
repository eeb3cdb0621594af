use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use ingest_common::error::{CloseCode, IngestError};
use ingest_protocol::{adpcm, AudioFrame, Handshake};
use ingest_uploader::{ObjectUploader, UploadConfig};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::rotator::{SegmentRotator, WavParams};

/// One inbound logical message, already reassembled by [`crate::reassemble`].
pub enum InboundMessage {
    Binary(Bytes),
    Text(String),
    Close,
}

/// What the caller (the transport glue) should do after handing a message to
/// the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Continue,
    Close(CloseCode),
}

/// Collaborators wired into a session at construction time, in place of a
/// runtime-managed DI container.
#[derive(Clone)]
pub struct SessionDeps {
    pub clock: Arc<dyn Clock>,
    pub uploader: Arc<dyn ObjectUploader>,
    pub upload_config: UploadConfig,
    pub project_root: PathBuf,
    pub rotation_interval: Duration,
}

struct Totals {
    frames: u64,
    bytes: u64,
    pcm_bytes: u64,
}

impl Totals {
    fn new() -> Totals {
        Totals { frames: 0, bytes: 0, pcm_bytes: 0 }
    }
}

enum State {
    AwaitingHandshake,
    AwaitingFrame {
        handshake: Handshake,
        next_seq: Option<u32>,
        rotator: SegmentRotator,
    },
    Closed,
}

/// Per-connection ingest state machine. Expects a handshake first, then a
/// stream of audio frames; drives the frame codec, the ADPCM decoder and the
/// segment rotator; reports close codes on protocol errors.
pub struct IngestSession {
    state: State,
    deps: SessionDeps,
    stream_id_for_log: Option<u32>,
    hwid: Option<String>,
    totals: Totals,
}

impl IngestSession {
    pub fn new(deps: SessionDeps, hwid: Option<String>) -> IngestSession {
        IngestSession {
            state: State::AwaitingHandshake,
            deps,
            stream_id_for_log: None,
            hwid,
            totals: Totals::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    pub async fn handle_message(&mut self, message: InboundMessage) -> SessionOutcome {
        match message {
            InboundMessage::Close => {
                self.state = State::Closed;
                SessionOutcome::Close(CloseCode::NORMAL)
            }
            InboundMessage::Text(_) => {
                self.state = State::Closed;
                SessionOutcome::Close(IngestError::InvalidMessageType.close_code().unwrap())
            }
            InboundMessage::Binary(payload) => self.handle_binary(payload).await,
        }
    }

    async fn handle_binary(&mut self, payload: Bytes) -> SessionOutcome {
        match &self.state {
            State::AwaitingHandshake => self.handle_handshake(&payload),
            State::AwaitingFrame { .. } => self.handle_frame(payload).await,
            State::Closed => SessionOutcome::Close(CloseCode::NORMAL),
        }
    }

    fn handle_handshake(&mut self, payload: &[u8]) -> SessionOutcome {
        let Some(handshake) = Handshake::parse(payload) else {
            self.state = State::Closed;
            return SessionOutcome::Close(IngestError::InvalidHandshake.close_code().unwrap());
        };

        log::info!(
            "handshake accepted: stream_id={} sample_rate={} channels={} codec={:?} frame_samples={}",
            handshake.stream_id,
            handshake.sample_rate,
            handshake.channels,
            handshake.codec,
            handshake.frame_samples,
        );

        self.stream_id_for_log = Some(handshake.stream_id);

        let wav_params = handshake.wav_enabled().then_some(WavParams {
            sample_rate: handshake.sample_rate,
            channels: handshake.channels,
        });

        let rotator = SegmentRotator::new(
            self.deps.project_root.clone(),
            handshake.stream_id,
            self.hwid.clone(),
            wav_params,
            self.deps.rotation_interval,
            self.deps.uploader.clone(),
            self.deps.upload_config.clone(),
            self.deps.clock.clone(),
        );

        self.state = State::AwaitingFrame {
            handshake,
            next_seq: None,
            rotator,
        };

        SessionOutcome::Continue
    }

    async fn handle_frame(&mut self, message: Bytes) -> SessionOutcome {
        let Some(frame) = AudioFrame::parse(message) else {
            self.state = State::Closed;
            return SessionOutcome::Close(IngestError::InvalidFrame.close_code().unwrap());
        };

        let State::AwaitingFrame { handshake, next_seq, rotator } = &mut self.state else {
            unreachable!("handle_frame only called in AwaitingFrame state")
        };

        if let Err(err) = frame.validate_against(handshake) {
            let ingest_err = match err {
                ingest_protocol::FrameValidationError::CodecMismatch => IngestError::FrameCodecMismatch,
                ingest_protocol::FrameValidationError::PayloadSize => IngestError::InvalidPayloadSize,
            };
            self.state = State::Closed;
            return SessionOutcome::Close(ingest_err.close_code().unwrap());
        }

        // Gap detection is relative to the received sequence: `next_seq`
        // advances past the gap too, so a second gap compares against the
        // just-received value, not the original baseline.
        if let Some(expected) = *next_seq {
            if frame.seq != expected {
                log::warn!(
                    "sequence gap: stream_id={} expected={} got={}",
                    handshake.stream_id,
                    expected,
                    frame.seq
                );
            }
        }
        *next_seq = Some(frame.seq.wrapping_add(1));

        let wav_enabled = handshake.wav_enabled();
        let codec = handshake.codec;
        let wire_len = frame.wire_len();

        self.totals.frames += 1;
        self.totals.bytes += wire_len as u64;

        if rotator.should_rotate() {
            if let Err(err) = rotator.rotate().await {
                let ingest_err = IngestError::from(err);
                log::error!("segment rotation failed: {ingest_err}");
                if let Err(close_err) = rotator.close_and_upload(&CancellationToken::new()).await {
                    log::error!("segment close after rotation failure failed: {close_err}");
                }
                self.state = State::Closed;
                return SessionOutcome::Close(ingest_err.close_code().unwrap_or(CloseCode::INTERNAL_ERROR));
            }
        }

        let mut wire_bytes = Vec::with_capacity(wire_len);
        wire_bytes.extend_from_slice(&frame.magic.to_le_bytes());
        wire_bytes.extend_from_slice(&(frame.payload.len() as u32).to_le_bytes());
        wire_bytes.extend_from_slice(&frame.seq.to_le_bytes());
        wire_bytes.extend_from_slice(&frame.payload);

        if let Err(err) = rotator.write_wire_frame(&wire_bytes).await {
            let ingest_err = IngestError::from(err);
            log::error!("raw segment write failed: {ingest_err}");
            if let Err(close_err) = rotator.close_and_upload(&CancellationToken::new()).await {
                log::error!("segment close after write failure failed: {close_err}");
            }
            self.state = State::Closed;
            return SessionOutcome::Close(ingest_err.close_code().unwrap_or(CloseCode::INTERNAL_ERROR));
        }

        if wav_enabled {
            let pcm = match codec {
                ingest_protocol::Codec::Pcm16Le => Some(frame.payload.to_vec()),
                ingest_protocol::Codec::ImaAdpcm => match adpcm::decode_block(&frame.payload) {
                    Ok(pcm) => Some(pcm),
                    Err(err) => {
                        log::warn!("adpcm decode failed, dropping pcm for this frame: {err}");
                        None
                    }
                },
                ingest_protocol::Codec::Unsupported(_) => None,
            };

            if let Some(pcm) = pcm {
                match rotator.write_pcm(pcm).await {
                    Ok(written) => self.totals.pcm_bytes += written as u64,
                    Err(err) => {
                        let ingest_err = IngestError::from(err);
                        log::error!("wav segment write failed: {ingest_err}");
                        if let Err(close_err) =
                            rotator.close_and_upload(&CancellationToken::new()).await
                        {
                            log::error!("segment close after write failure failed: {close_err}");
                        }
                        self.state = State::Closed;
                        return SessionOutcome::Close(
                            ingest_err.close_code().unwrap_or(CloseCode::INTERNAL_ERROR),
                        );
                    }
                }
            }
        }

        SessionOutcome::Continue
    }

    /// Runs the teardown path: closes and uploads the current segment (if
    /// any) with a fresh, non-cancellable scope, then logs the session
    /// summary line. Safe to call regardless of how the session ended.
    pub async fn teardown(&mut self) {
        if let State::AwaitingFrame { rotator, .. } = &mut self.state {
            let non_cancellable = CancellationToken::new();
            if let Err(err) = rotator.close_and_upload(&non_cancellable).await {
                log::error!("teardown segment close failed: {err}");
            }
        }

        self.state = State::Closed;

        log::info!(
            "session closed: stream_id={:?} hwid={:?} total_frames={} total_bytes={} total_pcm_bytes={}",
            self.stream_id_for_log,
            self.hwid,
            self.totals.frames,
            self.totals.bytes,
            self.totals.pcm_bytes,
        );
    }
}
