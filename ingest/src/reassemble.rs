use bytes::{Bytes, BytesMut};

/// The logical message kind, independent of any transport's framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Binary,
    Text,
}

/// Accumulates transport fragments into complete logical messages.
///
/// Pure and transport-agnostic: feed it `(kind, fragment, is_final)` triples
/// in arrival order and it yields one `(kind, bytes)` pair per logical
/// message, regardless of how many fragments the transport split it into.
/// A fresh initial capacity of 64 KiB covers the common case without extra
/// reallocation; payloads larger than that still work via `BytesMut`'s growth.
pub struct Reassembler {
    kind: Option<MessageKind>,
    buffer: BytesMut,
}

impl Default for Reassembler {
    fn default() -> Self {
        Reassembler {
            kind: None,
            buffer: BytesMut::with_capacity(64 * 1024),
        }
    }
}

impl Reassembler {
    pub fn new() -> Reassembler {
        Reassembler::default()
    }

    /// Feeds one fragment. Returns `Some` once `is_final` completes a
    /// message; the reassembler resets itself for the next message.
    pub fn push(&mut self, kind: MessageKind, fragment: &[u8], is_final: bool) -> Option<(MessageKind, Bytes)> {
        if self.kind.is_none() {
            self.kind = Some(kind);
        }

        self.buffer.extend_from_slice(fragment);

        if is_final {
            let kind = self.kind.take().unwrap_or(kind);
            let bytes = std::mem::replace(&mut self.buffer, BytesMut::with_capacity(64 * 1024)).freeze();
            Some((kind, bytes))
        } else {
            None
        }
    }
}
