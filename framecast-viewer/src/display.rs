//! Display renderer: blits decoded frames to the window.
//!
//! Uses GDI `StretchDIBits`, stretching each frame to the client area.

#[cfg(target_os = "windows")]
mod platform {
    use windows::Win32::Foundation::*;
    use windows::Win32::Graphics::Gdi::*;

    use framecast_core::{PixelBuffer, StreamError};

    /// Renders frames into an HWND using GDI.
    pub struct DisplayRenderer {
        hwnd: HWND,
        width: u32,
        height: u32,
    }

    impl DisplayRenderer {
        /// Create a renderer targeting the given window.
        pub fn new(hwnd: HWND, width: u32, height: u32) -> Self {
            Self {
                hwnd,
                width,
                height,
            }
        }

        /// Update the target size (call after WM_SIZE).
        pub fn resize(&mut self, width: u32, height: u32) {
            self.width = width;
            self.height = height;
        }

        /// Paint `frame`, stretched to fill the window.
        pub fn render(&self, frame: &PixelBuffer) -> Result<(), StreamError> {
            if frame.width() == 0 || frame.height() == 0 {
                return Ok(());
            }
            // 32bpp DIBs are laid out as BGRX.
            let bgra = frame.to_bgra8();

            unsafe {
                let hdc = GetDC(self.hwnd);
                if hdc.is_invalid() {
                    return Err(StreamError::Display("GetDC failed".into()));
                }

                let bmi = BITMAPINFO {
                    bmiHeader: BITMAPINFOHEADER {
                        biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                        biWidth: bgra.width() as i32,
                        // Negative height = top-down DIB (origin at top-left).
                        biHeight: -(bgra.height() as i32),
                        biPlanes: 1,
                        biBitCount: 32,
                        biCompression: BI_RGB.0,
                        biSizeImage: 0,
                        biXPelsPerMeter: 0,
                        biYPelsPerMeter: 0,
                        biClrUsed: 0,
                        biClrImportant: 0,
                    },
                    bmiColors: [RGBQUAD::default(); 1],
                };

                let lines = StretchDIBits(
                    hdc,
                    0,
                    0,
                    self.width as i32,
                    self.height as i32,
                    0,
                    0,
                    bgra.width() as i32,
                    bgra.height() as i32,
                    Some(bgra.data().as_ptr() as *const _),
                    &bmi,
                    DIB_RGB_COLORS,
                    SRCCOPY,
                );

                ReleaseDC(self.hwnd, hdc);

                if lines == 0 {
                    return Err(StreamError::Display("StretchDIBits copied no lines".into()));
                }
            }

            Ok(())
        }
    }
}

#[cfg(target_os = "windows")]
pub use platform::*;

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
pub mod stub {
    use framecast_core::{PixelBuffer, StreamError};

    pub struct DisplayRenderer;

    impl DisplayRenderer {
        pub fn new(_hwnd: (), _w: u32, _h: u32) -> Self {
            Self
        }

        pub fn resize(&mut self, _w: u32, _h: u32) {}

        pub fn render(&self, _frame: &PixelBuffer) -> Result<(), StreamError> {
            Err(StreamError::Display(
                "display rendering is only supported on Windows".into(),
            ))
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub use stub::*;
