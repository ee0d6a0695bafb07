//! Frame encoders.
//!
//! [`FrameEncoder`] turns a [`PixelBuffer`] into the opaque payload that
//! goes on the wire. [`JpegEncoder`] produces baseline JPEG via the
//! `image` crate, with a 1–100 quality knob trading size for fidelity.

use crate::error::StreamError;
use crate::stream::types::PixelBuffer;

/// Default JPEG quality (lower = smaller and faster).
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Compresses a raw frame to bytes.
///
/// A returned error means this one frame could not be encoded; callers
/// skip it and move on.
pub trait FrameEncoder {
    fn encode(&mut self, frame: &PixelBuffer) -> Result<Vec<u8>, StreamError>;
}

impl<E: FrameEncoder + ?Sized> FrameEncoder for Box<E> {
    fn encode(&mut self, frame: &PixelBuffer) -> Result<Vec<u8>, StreamError> {
        (**self).encode(frame)
    }
}

// ── JpegEncoder ──────────────────────────────────────────────────

/// Lossy JPEG encoder.
#[derive(Debug, Clone)]
pub struct JpegEncoder {
    quality: u8,
    frames_encoded: u64,
}

impl JpegEncoder {
    /// Create an encoder; `quality` must be within 1..=100.
    pub fn new(quality: u8) -> Result<Self, StreamError> {
        if !(1..=100).contains(&quality) {
            return Err(StreamError::Config(format!(
                "JPEG quality {quality} outside 1..=100"
            )));
        }
        Ok(Self {
            quality,
            frames_encoded: 0,
        })
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
            frames_encoded: 0,
        }
    }
}

impl FrameEncoder for JpegEncoder {
    fn encode(&mut self, frame: &PixelBuffer) -> Result<Vec<u8>, StreamError> {
        // JPEG has no alpha; BGRA captures are reordered to RGB first.
        let rgb = frame.to_rgb8();
        let mut out = Vec::with_capacity(rgb.data().len() / 8);
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, self.quality)
            .encode(
                rgb.data(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| StreamError::Encode(e.to_string()))?;

        self.frames_encoded += 1;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::types::PixelFormat;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x * 4) as u8, (y * 4) as u8, 128, 255]);
            }
        }
        PixelBuffer::new(width, height, PixelFormat::Bgra8, data).unwrap()
    }

    #[test]
    fn rejects_out_of_range_quality() {
        assert!(JpegEncoder::new(0).is_err());
        assert!(JpegEncoder::new(101).is_err());
        assert_eq!(JpegEncoder::new(100).unwrap().quality(), 100);
    }

    #[test]
    fn produces_jpeg_markers() {
        let mut enc = JpegEncoder::default();
        let bytes = enc.encode(&gradient(32, 16)).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "SOI marker");
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9], "EOI marker");
        assert_eq!(enc.frames_encoded(), 1);
    }

    #[test]
    fn lower_quality_is_smaller() {
        let frame = gradient(64, 64);
        let high = JpegEncoder::new(95).unwrap().encode(&frame).unwrap();
        let low = JpegEncoder::new(10).unwrap().encode(&frame).unwrap();
        assert!(low.len() < high.len());
    }
}
