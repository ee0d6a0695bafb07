//! Accumulating receive buffer for one connection.
//!
//! Bytes arrive in arbitrary read-sized chunks; complete wire units are
//! peeled off the front. The buffer grows by whatever the transport
//! delivers and shrinks by exactly one unit per successful extraction.

use bytes::BytesMut;

use super::frame::{self, WireUnit};
use crate::error::StreamError;

/// Where the buffer stands relative to the next wire unit boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceivePhase {
    /// Fewer than four bytes buffered.
    AwaitingLength,
    /// Prefix parsed; `needed` more payload bytes must arrive.
    AwaitingPayload { needed: usize },
    /// A complete unit is buffered and can be extracted.
    Ready,
}

/// Receive buffer owned by a single consumer loop.
#[derive(Debug)]
pub struct ReceiveBuffer {
    bytes: BytesMut,
    max_payload: usize,
}

impl ReceiveBuffer {
    /// Create an empty buffer that rejects payloads above `max_payload`.
    pub fn new(max_payload: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(64 * 1024),
            max_payload,
        }
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// See [`frame::try_extract`].
    pub fn try_extract(&mut self) -> Result<Option<WireUnit>, StreamError> {
        frame::try_extract(&mut self.bytes, self.max_payload)
    }

    /// Drop every buffered byte (desync recovery).
    pub fn reset(&mut self) {
        self.bytes.clear();
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Current position in the length → payload cycle.
    pub fn phase(&self) -> ReceivePhase {
        match frame::peek_length(&self.bytes) {
            None => ReceivePhase::AwaitingLength,
            Some(length) => {
                let total = frame::unit_len(length).unwrap_or(usize::MAX);
                if self.bytes.len() >= total {
                    ReceivePhase::Ready
                } else {
                    ReceivePhase::AwaitingPayload {
                        needed: total - self.bytes.len(),
                    }
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::frame::{DEFAULT_MAX_PAYLOAD_SIZE, encode};

    #[test]
    fn byte_at_a_time_yields_once() {
        let payload = b"fragmented payload".to_vec();
        let wire = encode(&payload).unwrap();
        let mut rx = ReceiveBuffer::new(DEFAULT_MAX_PAYLOAD_SIZE);

        let mut units = Vec::new();
        for (i, byte) in wire.iter().enumerate() {
            rx.extend(std::slice::from_ref(byte));
            if let Some(unit) = rx.try_extract().unwrap() {
                assert_eq!(i, wire.len() - 1, "unit surfaced before last byte");
                units.push(unit);
            }
        }

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].payload(), payload.as_slice());
        assert!(rx.is_empty());
    }

    #[test]
    fn arbitrary_split_points() {
        let payload: Vec<u8> = (0..1000u32).map(|i| (i * 7) as u8).collect();
        let wire = encode(&payload).unwrap();

        for chunk_size in [1usize, 2, 3, 5, 7, 64, 999, 1003, 4096] {
            let mut rx = ReceiveBuffer::new(DEFAULT_MAX_PAYLOAD_SIZE);
            let mut got = Vec::new();
            for chunk in wire.chunks(chunk_size) {
                rx.extend(chunk);
                while let Some(unit) = rx.try_extract().unwrap() {
                    got.push(unit);
                }
            }
            assert_eq!(got.len(), 1, "chunk size {chunk_size}");
            assert_eq!(got[0].payload(), payload.as_slice());
            assert!(rx.is_empty());
        }
    }

    #[test]
    fn phase_tracks_progress() {
        let wire = encode(b"abcdef").unwrap();
        let mut rx = ReceiveBuffer::new(1024);
        assert_eq!(rx.phase(), ReceivePhase::AwaitingLength);

        rx.extend(&wire[..2]);
        assert_eq!(rx.phase(), ReceivePhase::AwaitingLength);

        rx.extend(&wire[2..5]);
        assert_eq!(rx.phase(), ReceivePhase::AwaitingPayload { needed: 5 });

        rx.extend(&wire[5..]);
        assert_eq!(rx.phase(), ReceivePhase::Ready);

        rx.try_extract().unwrap().unwrap();
        assert_eq!(rx.phase(), ReceivePhase::AwaitingLength);
    }

    #[test]
    fn reset_discards_everything() {
        let mut rx = ReceiveBuffer::new(1024);
        rx.extend(&encode(b"one").unwrap());
        rx.extend(&encode(b"two").unwrap()[..3]);
        assert!(!rx.is_empty());

        rx.reset();
        assert!(rx.is_empty());
        assert_eq!(rx.len(), 0);
        assert!(rx.try_extract().unwrap().is_none());
    }
}
