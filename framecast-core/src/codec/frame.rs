//! Wire unit definition and the pure encode / extract functions.
//!
//! ## Wire format
//!
//! ```text
//! length:   u32 big-endian (4)
//! payload:  [u8] (length bytes, opaque)
//! ```
//!
//! Units are concatenated back-to-back on the stream with no marker,
//! handshake or trailer between them.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::StreamError;

// ── Constants ────────────────────────────────────────────────────

/// Size of the big-endian length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest payload a 32-bit prefix can describe.
pub const MAX_ENCODABLE_SIZE: usize = u32::MAX as usize;

/// Highest payload cap that keeps `prefix + payload` within `usize`.
pub const MAX_PAYLOAD_LIMIT: usize = if MAX_ENCODABLE_SIZE < usize::MAX - LENGTH_PREFIX_SIZE {
    MAX_ENCODABLE_SIZE
} else {
    usize::MAX - LENGTH_PREFIX_SIZE
};

/// Default cap on a received payload (64 MiB).
///
/// A length prefix above the cap is a framing violation. 64 MiB holds an
/// uncompressed 4K BGRA frame with room to spare; JPEG payloads are
/// orders of magnitude smaller.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

// ── WireUnit ─────────────────────────────────────────────────────

/// One length-prefixed payload as it appears on the wire.
///
/// `length()` always equals `payload().len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireUnit {
    length: u32,
    payload: Bytes,
}

impl WireUnit {
    /// Wrap a payload, checking that its length fits the prefix.
    pub fn new(payload: impl Into<Bytes>) -> Result<Self, StreamError> {
        let payload = payload.into();
        let length = prefix_for(payload.len())?;
        Ok(Self { length, payload })
    }

    /// Declared payload length.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Borrow the payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Bytes this unit occupies on the wire (prefix + payload).
    pub fn wire_len(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.payload.len()
    }
}

// ── Encoding ─────────────────────────────────────────────────────

fn prefix_for(size: usize) -> Result<u32, StreamError> {
    u32::try_from(size).map_err(|_| StreamError::PayloadTooLarge {
        size,
        max: MAX_ENCODABLE_SIZE,
    })
}

/// Encode `payload` as a self-delimited wire unit.
///
/// Returns the 4-byte big-endian length followed by `payload`
/// unmodified. Fails with [`StreamError::PayloadTooLarge`] when the
/// length does not fit in a `u32`.
pub fn encode(payload: &[u8]) -> Result<Vec<u8>, StreamError> {
    let length = prefix_for(payload.len())?;
    let mut out = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Append the wire form of `payload` to `dst`.
pub fn encode_into(payload: &[u8], dst: &mut BytesMut) -> Result<(), StreamError> {
    let length = prefix_for(payload.len())?;
    dst.reserve(LENGTH_PREFIX_SIZE + payload.len());
    dst.put_u32(length);
    dst.put_slice(payload);
    Ok(())
}

// ── Extraction ───────────────────────────────────────────────────

/// Total wire size of a unit announcing `length` payload bytes, or `None`
/// if it does not fit in `usize`.
pub fn unit_len(length: u32) -> Option<usize> {
    (length as usize).checked_add(LENGTH_PREFIX_SIZE)
}

/// Read the length prefix at the front of `buffer` without consuming it.
pub fn peek_length(buffer: &[u8]) -> Option<u32> {
    let prefix: [u8; LENGTH_PREFIX_SIZE] = buffer.get(..LENGTH_PREFIX_SIZE)?.try_into().ok()?;
    Some(u32::from_be_bytes(prefix))
}

/// Try to peel one complete wire unit off the front of `buffer`.
///
/// - `Ok(Some(unit))`: exactly `4 + length` bytes were removed.
/// - `Ok(None)`: the prefix or payload is incomplete; `buffer` is
///   untouched and the caller should append more bytes and retry.
/// - `Err(FrameTooLarge)`: the declared length exceeds `max_payload`;
///   `buffer` is untouched and the caller decides how to resync.
///
/// Never blocks and never touches a transport.
pub fn try_extract(
    buffer: &mut BytesMut,
    max_payload: usize,
) -> Result<Option<WireUnit>, StreamError> {
    let Some(length) = peek_length(buffer) else {
        return Ok(None);
    };

    let size = length as usize;
    let too_large = StreamError::FrameTooLarge {
        size,
        max: max_payload,
    };
    if size > max_payload {
        return Err(too_large);
    }
    let Some(total) = unit_len(length) else {
        return Err(too_large);
    };

    if buffer.len() < total {
        return Ok(None);
    }

    buffer.advance(LENGTH_PREFIX_SIZE);
    let payload = buffer.split_to(size).freeze();
    Ok(Some(WireUnit { length, payload }))
}

// ── Tests ────────────────────────────────────────────────────────
