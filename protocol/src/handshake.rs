use bytes::Buf;

use crate::Codec;

/// Magic that opens every ingest session: ASCII "ADPC" read as a little-endian `u32`.
pub const HANDSHAKE_MAGIC: u32 = 0x4144_5043;

const HANDSHAKE_VERSION: u16 = 1;
const HANDSHAKE_LEN: u16 = 32;

/// The fixed-layout preamble that opens every ingest session. Parameterizes
/// every frame that follows; never mutated after being set on a session.
#[derive(Debug, Clone, Copy)]
pub struct Handshake {
    pub stream_id: u32,
    pub sample_rate: u32,
    pub channels: u16,
    pub codec: Codec,
    pub frame_samples: u16,
    pub timestamp_ms: u64,
}

impl Handshake {
    /// Parses the complete payload of the first binary message.
    ///
    /// Bytes `[22..24)` are reserved padding. They are not read — any value
    /// there is legal and carries no meaning.
    pub fn parse(payload: &[u8]) -> Option<Handshake> {
        if payload.len() < HANDSHAKE_LEN as usize {
            return None;
        }

        let mut buf = payload;
        if buf.get_u32_le() != HANDSHAKE_MAGIC {
            return None;
        }
        if buf.get_u16_le() != HANDSHAKE_VERSION {
            return None;
        }
        if buf.get_u16_le() != HANDSHAKE_LEN {
            return None;
        }

        let stream_id = buf.get_u32_le();
        let sample_rate = buf.get_u32_le();
        let channels = buf.get_u16_le();
        let codec = Codec::from_raw(buf.get_u16_le());
        let frame_samples = buf.get_u16_le();
        buf.advance(2); // reserved
        let timestamp_ms = buf.get_u64_le();

        Some(Handshake {
            stream_id,
            sample_rate,
            channels,
            codec,
            frame_samples,
            timestamp_ms,
        })
    }

    /// `wavEnabled = (codec=PCM) OR (codec=Adpcm AND channels=1)`.
    pub fn wav_enabled(&self) -> bool {
        match self.codec {
            Codec::Pcm16Le => true,
            Codec::ImaAdpcm => self.channels == 1,
            Codec::Unsupported(_) => false,
        }
    }
}
