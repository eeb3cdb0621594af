use bytes::{Buf, Bytes};

use crate::handshake::Handshake;
use crate::Codec;

/// `0x464D4350` — ASCII "PCMF" read little-endian: a raw PCM_S16LE frame.
pub const PCMF_MAGIC: u32 = 0x464D_4350;
/// `0x4144_5046` — ASCII "ADPF" read little-endian: an IMA ADPCM frame.
pub const ADPF_MAGIC: u32 = 0x4144_5046;

const FRAME_HEADER_LEN: usize = 12;

/// One 12-byte-header + payload audio message.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub magic: u32,
    pub seq: u32,
    pub payload: Bytes,
}

impl AudioFrame {
    /// Total size this frame occupied on the wire (header + payload), used
    /// for the raw `.bin` byte accounting.
    pub fn wire_len(&self) -> usize {
        FRAME_HEADER_LEN + self.payload.len()
    }

    /// Parses one complete binary message into a frame. Does not validate
    /// against a handshake — see [`validate_against`].
    pub fn parse(message: Bytes) -> Option<AudioFrame> {
        if message.len() < FRAME_HEADER_LEN {
            return None;
        }

        let mut buf = message.clone();
        let magic = buf.get_u32_le();
        if magic != PCMF_MAGIC && magic != ADPF_MAGIC {
            return None;
        }

        let length = buf.get_u32_le() as usize;
        let seq = buf.get_u32_le();
        let payload = message.slice(FRAME_HEADER_LEN..);

        if length != payload.len() {
            return None;
        }

        Some(AudioFrame { magic, seq, payload })
    }

    /// Cross-validates this frame against the session's handshake: the magic
    /// must match the negotiated codec, and the payload must be sized
    /// correctly for that codec.
    pub fn validate_against(&self, handshake: &Handshake) -> Result<(), FrameValidationError> {
        let expected_magic = match handshake.codec {
            Codec::Pcm16Le => PCMF_MAGIC,
            Codec::ImaAdpcm => ADPF_MAGIC,
            Codec::Unsupported(_) => {
                // Any frame sent under an unsupported codec is, by
                // definition, a mismatch: there is no magic it could match.
                return Err(FrameValidationError::CodecMismatch);
            }
        };

        if self.magic != expected_magic {
            return Err(FrameValidationError::CodecMismatch);
        }

        match handshake.codec {
            Codec::Pcm16Le => {
                let expected =
                    handshake.frame_samples as usize * handshake.channels as usize * 2;
                if self.payload.len() != expected {
                    return Err(FrameValidationError::PayloadSize);
                }
            }
            Codec::ImaAdpcm => {
                let max = 4 + (handshake.frame_samples as usize * handshake.channels as usize) / 2
                    + 16;
                if self.payload.len() < 4 || self.payload.len() > max {
                    return Err(FrameValidationError::PayloadSize);
                }
            }
            Codec::Unsupported(_) => unreachable!("handled above"),
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameValidationError {
    CodecMismatch,
    PayloadSize,
}
