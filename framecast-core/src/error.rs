//! Domain-specific error types for the framecast protocol.
//!
//! All fallible operations return `Result<T, StreamError>`.
//! Each variant belongs to one failure class, and [`StreamError::is_fatal`]
//! tells a streaming loop whether it must stop or may absorb the error.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for framecast.
#[derive(Debug, Error)]
pub enum StreamError {
    // ── Transport Errors ─────────────────────────────────────────
    /// The TCP/IO layer reported an error (refused, reset, broken pipe).
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A host name could not be resolved to a socket address.
    #[error("cannot resolve '{host}': {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Framing Errors ───────────────────────────────────────────
    /// The payload cannot be represented by a 32-bit length prefix.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A received length prefix exceeds the accepted frame size.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // ── Pipeline Errors ──────────────────────────────────────────
    /// The screen source could not produce a frame.
    #[error("capture error: {0}")]
    Capture(String),

    /// The encoder could not produce output for a frame.
    #[error("encode error: {0}")]
    Encode(String),

    /// A payload could not be decoded into an image.
    #[error("decode error: {0}")]
    Decode(String),

    /// A pixel buffer's dimensions and data length disagree.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The display surface failed to paint a frame.
    #[error("display error: {0}")]
    Display(String),

    // ── Application Errors ───────────────────────────────────────
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A lifecycle transition was attempted from the wrong phase.
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),
}

impl StreamError {
    /// Whether this error must terminate the loop that observed it.
    ///
    /// Encode, decode, framing and display failures are absorbed by the
    /// loops; everything else ends the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            StreamError::Encode(_)
                | StreamError::Decode(_)
                | StreamError::PayloadTooLarge { .. }
                | StreamError::FrameTooLarge { .. }
                | StreamError::Display(_)
        )
    }

    /// Short name of the failure class, used in diagnostics.
    pub fn class(&self) -> &'static str {
        match self {
            StreamError::Transport(_) => "transport",
            StreamError::Resolve { .. } => "resolve",
            StreamError::Timeout(_) => "timeout",
            StreamError::PayloadTooLarge { .. } | StreamError::FrameTooLarge { .. } => "framing",
            StreamError::Capture(_) => "capture",
            StreamError::Encode(_) => "encode",
            StreamError::Decode(_) | StreamError::InvalidFrame(_) => "decode",
            StreamError::Display(_) => "display",
            StreamError::Config(_) => "config",
            StreamError::InvalidTransition(_) => "state",
        }
    }
}

impl From<image::ImageError> for StreamError {
    fn from(e: image::ImageError) -> Self {
        StreamError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = StreamError::FrameTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));

        let e = StreamError::Resolve {
            host: "nowhere.invalid".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such host"),
        };
        assert!(e.to_string().contains("nowhere.invalid"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: StreamError = io_err.into();
        assert!(matches!(e, StreamError::Transport(_)));
        assert!(e.is_fatal());
    }

    #[test]
    fn fatal_classification() {
        assert!(StreamError::Capture("locked".into()).is_fatal());
        assert!(StreamError::Timeout(Duration::from_secs(1)).is_fatal());
        assert!(StreamError::Config("port".into()).is_fatal());

        assert!(!StreamError::Encode("empty".into()).is_fatal());
        assert!(!StreamError::Decode("bad marker".into()).is_fatal());
        assert!(!StreamError::Display("no dc".into()).is_fatal());
        assert!(!StreamError::FrameTooLarge { size: 2, max: 1 }.is_fatal());
    }

    #[test]
    fn class_names() {
        assert_eq!(StreamError::Decode("x".into()).class(), "decode");
        assert_eq!(
            StreamError::PayloadTooLarge { size: 2, max: 1 }.class(),
            "framing"
        );
    }
}
