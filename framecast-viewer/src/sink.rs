//! Window-backed display sink.

use framecast_core::{DisplaySink, PixelBuffer, StreamError};

use crate::display::DisplayRenderer;
use crate::window::{NativeWindow, WindowEvent};

/// Virtual-key code for an exit key character (letters and digits map
/// to their upper-case ASCII code).
pub fn virtual_key_for(key: char) -> Option<u16> {
    key.is_ascii_alphanumeric()
        .then(|| key.to_ascii_uppercase() as u16)
}

// ── ExitWatch ────────────────────────────────────────────────────

/// Tracks window events that end the session.
#[derive(Debug, Clone)]
pub struct ExitWatch {
    exit_key: Option<u16>,
    requested: bool,
}

impl ExitWatch {
    pub fn new(exit_key: Option<u16>) -> Self {
        Self {
            exit_key,
            requested: false,
        }
    }

    /// Record one event. Returns a new size on resize.
    pub fn observe(&mut self, event: &WindowEvent) -> Option<(u32, u32)> {
        match *event {
            WindowEvent::Close => self.requested = true,
            WindowEvent::KeyDown(vk) if Some(vk) == self.exit_key => self.requested = true,
            WindowEvent::Resize(w, h) => return Some((w, h)),
            WindowEvent::KeyDown(_) => {}
        }
        None
    }

    pub fn requested(&self) -> bool {
        self.requested
    }
}

// ── WindowSink ───────────────────────────────────────────────────

/// Paints frames into a [`NativeWindow`] and reports exit requests
/// from its message queue.
pub struct WindowSink {
    window: NativeWindow,
    renderer: DisplayRenderer,
    exit: ExitWatch,
}

impl WindowSink {
    pub fn new(window: NativeWindow, renderer: DisplayRenderer, exit_key: Option<u16>) -> Self {
        Self {
            window,
            renderer,
            exit: ExitWatch::new(exit_key),
        }
    }

    fn pump(&mut self) {
        for event in self.window.poll_events() {
            if let Some((w, h)) = self.exit.observe(&event) {
                self.renderer.resize(w, h);
            }
        }
    }
}

impl DisplaySink for WindowSink {
    fn present(&mut self, frame: &PixelBuffer) -> Result<(), StreamError> {
        self.renderer.render(frame)
    }

    fn exit_requested(&mut self) -> bool {
        self.pump();
        self.exit.requested()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_key_codes() {
        assert_eq!(virtual_key_for('q'), Some(0x51));
        assert_eq!(virtual_key_for('Q'), Some(0x51));
        assert_eq!(virtual_key_for('7'), Some(0x37));
        assert_eq!(virtual_key_for('!'), None);
    }

    #[test]
    fn exit_on_key_or_close() {
        let mut watch = ExitWatch::new(virtual_key_for('q'));
        watch.observe(&WindowEvent::KeyDown(0x41));
        assert!(!watch.requested());
        watch.observe(&WindowEvent::KeyDown(0x51));
        assert!(watch.requested());

        let mut watch = ExitWatch::new(None);
        watch.observe(&WindowEvent::KeyDown(0x51));
        assert!(!watch.requested());
        watch.observe(&WindowEvent::Close);
        assert!(watch.requested());
    }

    #[test]
    fn resize_is_reported() {
        let mut watch = ExitWatch::new(None);
        assert_eq!(watch.observe(&WindowEvent::Resize(800, 600)), Some((800, 600)));
        assert!(!watch.requested());
    }
}
