//! Frame sources.
//!
//! [`FrameSource`] is the seam between the producer loop and whatever
//! produces raw screen images. [`DxgiCapturer`] implements it with the
//! Direct3D 11 Desktop Duplication API.
//!
//! # Platform
//!
//! `DxgiCapturer` is **Windows-only**. On other platforms the type is
//! still defined but construction fails at runtime.

use crate::error::StreamError;
use crate::stream::types::{CaptureRegion, PixelBuffer};

// ── FrameSource ──────────────────────────────────────────────────

/// Produces a raw image of the configured screen region on demand.
///
/// `capture` is synchronous and bounded in time. Returning
/// [`StreamError::Timeout`] means "nothing new yet, ask again"; any other
/// error is treated as a persistent capture failure.
pub trait FrameSource {
    fn capture(&mut self) -> Result<PixelBuffer, StreamError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn capture(&mut self) -> Result<PixelBuffer, StreamError> {
        (**self).capture()
    }
}

// ── CaptureSettings ──────────────────────────────────────────────

/// Which monitor to duplicate and which part of it to keep.
#[derive(Debug, Clone, Default)]
pub struct CaptureSettings {
    /// DXGI output index (0 = primary).
    pub monitor_index: u32,
    /// Optional crop; `None` keeps the whole monitor.
    pub region: Option<CaptureRegion>,
    /// Acquire timeout in milliseconds.
    pub timeout_ms: u32,
}

/// DXGI-based screen capturer.
///
/// Wraps the `IDXGIOutputDuplication` pipeline:
///
/// 1. Create a D3D11 device.
/// 2. Enumerate outputs and duplicate the target monitor.
/// 3. Create a CPU-readable staging texture.
/// 4. On each [`capture`](FrameSource::capture):
///    - `AcquireNextFrame` (blocks up to `timeout_ms`).
///    - Copy the desktop texture to the staging texture.
///    - Map, repack rows into a [`PixelBuffer`], unmap.
///
/// The compositor only hands out a frame when the desktop changed, so
/// the last captured image is kept and returned again on timeout.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub struct DxgiCapturer {
    width: u32,
    height: u32,
    settings: CaptureSettings,
    last: Option<PixelBuffer>,

    #[cfg(target_os = "windows")]
    context: windows::Win32::Graphics::Direct3D11::ID3D11DeviceContext,
    #[cfg(target_os = "windows")]
    duplication: windows::Win32::Graphics::Dxgi::IDXGIOutputDuplication,
    #[cfg(target_os = "windows")]
    staging_texture: windows::Win32::Graphics::Direct3D11::ID3D11Texture2D,
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
impl DxgiCapturer {
    /// Screen width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Screen height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    fn finish(&mut self, full: PixelBuffer) -> Result<PixelBuffer, StreamError> {
        let frame = match &self.settings.region {
            Some(region) => full.crop(region).map_err(|e| {
                StreamError::Capture(format!("capture region does not fit the monitor: {e}"))
            })?,
            None => full,
        };
        self.last = Some(frame.clone());
        Ok(frame)
    }

    fn on_timeout(&self) -> Result<PixelBuffer, StreamError> {
        match &self.last {
            Some(frame) => Ok(frame.clone()),
            None => Err(StreamError::Timeout(std::time::Duration::from_millis(
                self.settings.timeout_ms as u64,
            ))),
        }
    }
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use crate::stream::types::PixelFormat;
    use windows::{
        Win32::Graphics::{
            Direct3D::D3D_DRIVER_TYPE_HARDWARE,
            Direct3D11::*,
            Dxgi::{Common::*, *},
        },
        core::Interface,
    };

    fn capture_err(what: &str, e: impl std::fmt::Display) -> StreamError {
        StreamError::Capture(format!("{what}: {e}"))
    }

    impl DxgiCapturer {
        /// Initialise the capturer for the monitor named in `settings`.
        pub fn new(settings: CaptureSettings) -> Result<Self, StreamError> {
            unsafe { Self::init_dxgi(settings) }
        }

        unsafe fn init_dxgi(settings: CaptureSettings) -> Result<Self, StreamError> {
            let mut device = None;
            let mut context = None;
            unsafe {
                D3D11CreateDevice(
                    None,
                    D3D_DRIVER_TYPE_HARDWARE,
                    None,
                    D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                    None,
                    D3D11_SDK_VERSION,
                    Some(&mut device),
                    None,
                    Some(&mut context),
                )
                .map_err(|e| capture_err("D3D11CreateDevice failed", e))?;
            }

            let device: ID3D11Device =
                device.ok_or_else(|| StreamError::Capture("D3D11 device is None".into()))?;
            let context =
                context.ok_or_else(|| StreamError::Capture("D3D11 context is None".into()))?;

            // Device → Adapter → Output.
            let dxgi_device: IDXGIDevice = device
                .cast()
                .map_err(|e| capture_err("cast to IDXGIDevice failed", e))?;
            let adapter = unsafe { dxgi_device.GetAdapter() }
                .map_err(|e| capture_err("GetAdapter failed", e))?;
            let output: IDXGIOutput = unsafe { adapter.EnumOutputs(settings.monitor_index) }
                .map_err(|e| {
                    capture_err(&format!("monitor {} not found", settings.monitor_index), e)
                })?;

            let output1: IDXGIOutput1 = output
                .cast()
                .map_err(|e| capture_err("cast to IDXGIOutput1 failed", e))?;
            let duplication = unsafe { output1.DuplicateOutput(&device) }
                .map_err(|e| capture_err("DuplicateOutput failed", e))?;

            let dup_desc = unsafe { duplication.GetDesc() };
            let width = dup_desc.ModeDesc.Width;
            let height = dup_desc.ModeDesc.Height;

            if let Some(region) = &settings.region {
                if !region.fits_within(width, height) {
                    return Err(StreamError::Capture(format!(
                        "capture region {region:?} outside {width}x{height} monitor"
                    )));
                }
            }

            let staging_desc = D3D11_TEXTURE2D_DESC {
                Width: width,
                Height: height,
                MipLevels: 1,
                ArraySize: 1,
                Format: DXGI_FORMAT_B8G8R8A8_UNORM,
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    Quality: 0,
                },
                Usage: D3D11_USAGE_STAGING,
                BindFlags: 0,
                CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
                MiscFlags: 0,
            };

            let mut staging_texture = None;
            unsafe {
                device
                    .CreateTexture2D(&staging_desc, None, Some(&mut staging_texture))
                    .map_err(|e| capture_err("CreateTexture2D (staging) failed", e))?;
            }
            let staging_texture = staging_texture
                .ok_or_else(|| StreamError::Capture("staging texture is None".into()))?;

            Ok(Self {
                width,
                height,
                settings,
                last: None,
                context,
                duplication,
                staging_texture,
            })
        }

        unsafe fn acquire(&mut self) -> Result<Option<PixelBuffer>, StreamError> {
            let mut frame_info = DXGI_OUTDUPL_FRAME_INFO::default();
            let mut resource = None;

            match unsafe {
                self.duplication.AcquireNextFrame(
                    self.settings.timeout_ms,
                    &mut frame_info,
                    &mut resource,
                )
            } {
                Ok(()) => {}
                Err(e) if e.code() == DXGI_ERROR_WAIT_TIMEOUT => return Ok(None),
                Err(e) => return Err(capture_err("AcquireNextFrame failed", e)),
            }

            let resource =
                resource.ok_or_else(|| StreamError::Capture("acquired resource is None".into()))?;
            let texture: ID3D11Texture2D = resource.cast().map_err(|e| {
                let _ = unsafe { self.duplication.ReleaseFrame() };
                capture_err("cast to ID3D11Texture2D failed", e)
            })?;

            unsafe { self.context.CopyResource(&self.staging_texture, &texture) };
            let _ = unsafe { self.duplication.ReleaseFrame() };

            let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
            unsafe {
                self.context
                    .Map(&self.staging_texture, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
                    .map_err(|e| capture_err("Map failed", e))?;
            }

            let stride = mapped.RowPitch as usize;
            let total = stride * self.height as usize;
            let src = unsafe { std::slice::from_raw_parts(mapped.pData as *const u8, total) };
            let frame =
                PixelBuffer::from_strided(self.width, self.height, stride, PixelFormat::Bgra8, src);

            unsafe { self.context.Unmap(&self.staging_texture, 0) };

            frame.map(Some)
        }
    }

    impl FrameSource for DxgiCapturer {
        fn capture(&mut self) -> Result<PixelBuffer, StreamError> {
            match unsafe { self.acquire() }? {
                Some(full) => self.finish(full),
                None => self.on_timeout(),
            }
        }
    }
}

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
impl DxgiCapturer {
    /// DXGI is only available on Windows.
    pub fn new(_settings: CaptureSettings) -> Result<Self, StreamError> {
        Err(StreamError::Capture(
            "DXGI Desktop Duplication is only available on Windows".into(),
        ))
    }
}

#[cfg(not(target_os = "windows"))]
impl FrameSource for DxgiCapturer {
    fn capture(&mut self) -> Result<PixelBuffer, StreamError> {
        Err(StreamError::Capture("not supported on this platform".into()))
    }
}
