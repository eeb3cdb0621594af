pub mod adpcm;
pub mod frame;
pub mod handshake;
pub mod wav;

pub use adpcm::{decode_block, AdpcmDecodeError};
pub use frame::{AudioFrame, FrameValidationError, ADPF_MAGIC, PCMF_MAGIC};
pub use handshake::{Handshake, HANDSHAKE_MAGIC};
pub use wav::WavSegmentWriter;

/// The codec negotiated by the handshake. Any value outside `{0, 1}` is
/// accepted on the wire but disables WAV decoding downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Pcm16Le,
    ImaAdpcm,
    Unsupported(u16),
}

impl Codec {
    pub fn from_raw(raw: u16) -> Codec {
        match raw {
            0 => Codec::Pcm16Le,
            1 => Codec::ImaAdpcm,
            other => Codec::Unsupported(other),
        }
    }
}
