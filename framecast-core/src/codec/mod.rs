//! Framing codec: length-prefixed wire units on a byte stream.
//!
//! [`encode`] and [`try_extract`] are pure buffer operations. The
//! streaming loops drive them by hand through a [`ReceiveBuffer`];
//! [`WireCodec`] exposes the same framing to `tokio_util::codec::Framed`.

pub mod buffer;
pub mod frame;

pub use buffer::{ReceiveBuffer, ReceivePhase};
pub use frame::{
    DEFAULT_MAX_PAYLOAD_SIZE, LENGTH_PREFIX_SIZE, MAX_ENCODABLE_SIZE, MAX_PAYLOAD_LIMIT, WireUnit,
    encode, encode_into, peek_length, try_extract, unit_len,
};

use bytes::{Bytes, BytesMut};

use crate::error::StreamError;

/// `tokio_util` codec over the length-prefixed wire format.
#[derive(Debug, Clone)]
pub struct WireCodec {
    max_payload: usize,
}

impl WireCodec {
    pub fn new(max_payload: usize) -> Self {
        Self { max_payload }
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD_SIZE)
    }
}

impl tokio_util::codec::Decoder for WireCodec {
    type Item = WireUnit;
    type Error = StreamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let unit = try_extract(src, self.max_payload)?;
        if unit.is_none() {
            if let Some(total) = peek_length(src).and_then(unit_len) {
                src.reserve(total.saturating_sub(src.len()));
            }
        }
        Ok(unit)
    }
}

impl tokio_util::codec::Encoder<Bytes> for WireCodec {
    type Error = StreamError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_into(&item, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use tokio_util::codec::{Decoder, Framed};

    #[test]
    fn decoder_waits_for_full_unit() {
        let mut codec = WireCodec::default();
        let wire = frame::encode(b"payload").unwrap();
        let mut buf = BytesMut::from(&wire[..6]);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&wire[6..]);
        let unit = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(unit.payload(), b"payload");
    }

    #[tokio::test]
    async fn framed_duplex_roundtrip() {
        let (a, b) = tokio::io::duplex(64);
        let mut tx = Framed::new(a, WireCodec::default());
        let mut rx = Framed::new(b, WireCodec::default());

        let writer = tokio::spawn(async move {
            tx.send(Bytes::from_static(b"")).await.unwrap();
            tx.send(Bytes::from(vec![0x5A; 300])).await.unwrap();
        });

        let first = rx.next().await.unwrap().unwrap();
        let second = rx.next().await.unwrap().unwrap();
        writer.await.unwrap();

        assert_eq!(first.length(), 0);
        assert_eq!(second.payload(), vec![0x5A; 300].as_slice());
    }

    #[tokio::test]
    async fn framed_rejects_oversized_prefix() {
        let (mut a, b) = tokio::io::duplex(64);
        let mut rx = Framed::new(b, WireCodec::new(8));

        tokio::io::AsyncWriteExt::write_all(&mut a, &[0, 0, 1, 0])
            .await
            .unwrap();
        let err = rx.next().await.unwrap().unwrap_err();
        assert!(matches!(err, StreamError::FrameTooLarge { size: 256, max: 8 }));
    }
}
