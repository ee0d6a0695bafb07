//! Shared types for the capture/display pipeline.
//!
//! A [`PixelBuffer`] is the transient raw image handed from the frame
//! source to the encoder, and from the decoder to the display sink.
//! It never crosses the wire; only encoder output does.

use crate::error::StreamError;

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout for raw frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 4 bytes per pixel: Blue, Green, Red, Alpha (DXGI default).
    Bgra8,
    /// 4 bytes per pixel: Red, Green, Blue, Alpha.
    Rgba8,
    /// 3 bytes per pixel: Red, Green, Blue.
    Rgb8,
}

impl PixelFormat {
    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }

    /// Byte offsets of the red, green and blue channels within a pixel.
    const fn rgb_offsets(self) -> (usize, usize, usize) {
        match self {
            PixelFormat::Bgra8 => (2, 1, 0),
            PixelFormat::Rgba8 | PixelFormat::Rgb8 => (0, 1, 2),
        }
    }
}

// ── CaptureRegion ────────────────────────────────────────────────

/// Rectangle, in pixels, cut out of a captured monitor image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the region lies entirely within a `width` × `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= height)
    }
}

// ── PixelBuffer ──────────────────────────────────────────────────

/// A raw, tightly packed image.
///
/// `data` holds `height` rows of `width * bytes_per_pixel` bytes each,
/// with no row padding. Construction checks the length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap `data`, checking it matches the dimensions and format.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, StreamError> {
        let expected = Self::byte_len_for(width, height, format);
        if data.len() != expected {
            return Err(StreamError::InvalidFrame(format!(
                "{width}x{height} {format:?} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Repack a buffer whose rows are `stride` bytes apart (GPU row
    /// alignment) into a tightly packed one.
    pub fn from_strided(
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
        data: &[u8],
    ) -> Result<Self, StreamError> {
        let row_len = width as usize * format.bytes_per_pixel();
        if stride < row_len || data.len() < stride * height as usize {
            return Err(StreamError::InvalidFrame(format!(
                "stride {stride} too small for {width}px rows or data truncated ({} bytes)",
                data.len()
            )));
        }
        let mut packed = Vec::with_capacity(row_len * height as usize);
        for row in data.chunks(stride).take(height as usize) {
            packed.extend_from_slice(&row[..row_len]);
        }
        Self::new(width, height, format, packed)
    }

    fn byte_len_for(width: u32, height: u32, format: PixelFormat) -> usize {
        width as usize * height as usize * format.bytes_per_pixel()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes per row.
    pub fn row_len(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Copy out the sub-image described by `region`.
    pub fn crop(&self, region: &CaptureRegion) -> Result<Self, StreamError> {
        if !region.fits_within(self.width, self.height) {
            return Err(StreamError::InvalidFrame(format!(
                "region {region:?} outside {}x{} frame",
                self.width, self.height
            )));
        }
        let bpp = self.format.bytes_per_pixel();
        let row_len = self.row_len();
        let start_x = region.x as usize * bpp;
        let out_row = region.width as usize * bpp;

        let mut out = Vec::with_capacity(out_row * region.height as usize);
        for y in region.y..region.y + region.height {
            let start = y as usize * row_len + start_x;
            out.extend_from_slice(&self.data[start..start + out_row]);
        }
        Self::new(region.width, region.height, self.format, out)
    }

    /// Convert to packed RGB, dropping any alpha channel.
    pub fn to_rgb8(&self) -> Self {
        if self.format == PixelFormat::Rgb8 {
            return self.clone();
        }
        let (r, g, b) = self.format.rgb_offsets();
        let bpp = self.format.bytes_per_pixel();
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for px in self.data.chunks_exact(bpp) {
            out.extend_from_slice(&[px[r], px[g], px[b]]);
        }
        Self {
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgb8,
            data: out,
        }
    }

    /// Convert to BGRA with opaque alpha (the layout GDI blits expect).
    pub fn to_bgra8(&self) -> Self {
        if self.format == PixelFormat::Bgra8 {
            return self.clone();
        }
        let (r, g, b) = self.format.rgb_offsets();
        let bpp = self.format.bytes_per_pixel();
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for px in self.data.chunks_exact(bpp) {
            out.extend_from_slice(&[px[b], px[g], px[r], 0xFF]);
        }
        Self {
            width: self.width,
            height: self.height,
            format: PixelFormat::Bgra8,
            data: out,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn bgra_2x2() -> PixelBuffer {
        #[rustfmt::skip]
        let data = vec![
            1, 2, 3, 255,    4, 5, 6, 255,
            7, 8, 9, 255,    10, 11, 12, 255,
        ];
        PixelBuffer::new(2, 2, PixelFormat::Bgra8, data).unwrap()
    }

    #[test]
    fn new_rejects_wrong_length() {
        let err = PixelBuffer::new(2, 2, PixelFormat::Rgb8, vec![0; 11]).unwrap_err();
        assert!(matches!(err, StreamError::InvalidFrame(_)));
    }

    #[test]
    fn bgra_to_rgb_swaps_channels() {
        let rgb = bgra_2x2().to_rgb8();
        assert_eq!(rgb.format(), PixelFormat::Rgb8);
        assert_eq!(&rgb.data()[..6], &[3, 2, 1, 6, 5, 4]);
        assert_eq!(rgb.data().len(), 12);
    }

    #[test]
    fn rgb_to_bgra_adds_alpha() {
        let rgb = PixelBuffer::new(1, 1, PixelFormat::Rgb8, vec![10, 20, 30]).unwrap();
        let bgra = rgb.to_bgra8();
        assert_eq!(bgra.data(), &[30, 20, 10, 255]);
    }

    #[test]
    fn crop_extracts_sub_image() {
        let frame = bgra_2x2();
        let right_col = frame.crop(&CaptureRegion::new(1, 0, 1, 2)).unwrap();
        assert_eq!(right_col.width(), 1);
        assert_eq!(right_col.height(), 2);
        assert_eq!(right_col.data(), &[4, 5, 6, 255, 10, 11, 12, 255]);
    }

    #[test]
    fn crop_outside_bounds_fails() {
        let frame = bgra_2x2();
        assert!(frame.crop(&CaptureRegion::new(1, 1, 2, 1)).is_err());
        assert!(frame.crop(&CaptureRegion::new(0, 0, 0, 1)).is_err());
        assert!(frame.crop(&CaptureRegion::new(u32::MAX, 0, 1, 1)).is_err());
    }

    #[test]
    fn from_strided_drops_padding() {
        // 2px BGRA rows padded to 12 bytes.
        let mut data = Vec::new();
        data.extend_from_slice(&[1, 1, 1, 1, 2, 2, 2, 2, 0xEE, 0xEE, 0xEE, 0xEE]);
        data.extend_from_slice(&[3, 3, 3, 3, 4, 4, 4, 4, 0xEE, 0xEE, 0xEE, 0xEE]);
        let frame = PixelBuffer::from_strided(2, 2, 12, PixelFormat::Bgra8, &data).unwrap();
        assert_eq!(frame.data().len(), 16);
        assert!(!frame.data().contains(&0xEE));
    }
}
