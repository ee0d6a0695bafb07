//! Display sinks.

use crate::error::StreamError;
use crate::stream::types::PixelBuffer;

/// The on-screen surface that paints decoded frames.
pub trait DisplaySink {
    /// Paint one frame. Errors are logged by the caller and streaming
    /// continues.
    fn present(&mut self, frame: &PixelBuffer) -> Result<(), StreamError>;

    /// Whether the user asked to stop (exit key, window closed).
    ///
    /// Called after every presented frame and while waiting for data,
    /// so implementations may also pump their event queue here.
    fn exit_requested(&mut self) -> bool;
}

impl<K: DisplaySink + ?Sized> DisplaySink for Box<K> {
    fn present(&mut self, frame: &PixelBuffer) -> Result<(), StreamError> {
        (**self).present(frame)
    }

    fn exit_requested(&mut self) -> bool {
        (**self).exit_requested()
    }
}
