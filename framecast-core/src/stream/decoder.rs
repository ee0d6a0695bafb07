//! Frame decoders.
//!
//! The payload is treated strictly as an encoded image: the decoder
//! parses a JPEG byte stream and nothing else. No generic object graph
//! is ever deserialized from the wire.

use image::ImageFormat;

use crate::error::StreamError;
use crate::stream::types::{PixelBuffer, PixelFormat};

/// Decompresses one payload into a raw frame.
///
/// An error means the payload is structurally invalid (corrupt or
/// truncated data that still matched its declared length).
pub trait FrameDecoder {
    fn decode(&mut self, payload: &[u8]) -> Result<PixelBuffer, StreamError>;
}

impl<D: FrameDecoder + ?Sized> FrameDecoder for Box<D> {
    fn decode(&mut self, payload: &[u8]) -> Result<PixelBuffer, StreamError> {
        (**self).decode(payload)
    }
}

// ── JpegDecoder ──────────────────────────────────────────────────

/// JPEG decoder producing packed RGB frames.
#[derive(Debug, Default)]
pub struct JpegDecoder {
    frames_decoded: u64,
}

impl JpegDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }
}

impl FrameDecoder for JpegDecoder {
    fn decode(&mut self, payload: &[u8]) -> Result<PixelBuffer, StreamError> {
        let image = image::load_from_memory_with_format(payload, ImageFormat::Jpeg)?.into_rgb8();
        let (width, height) = image.dimensions();
        let frame = PixelBuffer::new(width, height, PixelFormat::Rgb8, image.into_raw())?;
        self.frames_decoded += 1;
        Ok(frame)
    }
}
