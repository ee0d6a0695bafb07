//! Stream lifecycle state machine shared by producer and consumer.
//!
//! Models the life of the single connection a side owns, with
//! validated transitions that return `Result` instead of panicking.
//!
//! ```text
//!  Idle ──► Listening ──┐
//!    │                  ├──► Streaming ──► Closed(reason)
//!    └───► Connecting ──┘        │
//!                 │              └───────► Failed
//!                 └──────────────────────► Failed
//! ```

use std::time::Instant;

use crate::error::StreamError;

// ── CloseReason / StreamOutcome ──────────────────────────────────

/// Why a stream ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The remote side closed the connection cleanly.
    PeerClosed,
    /// The local user asked to stop (exit key, window closed).
    UserExit,
    /// The stop handle was cleared (Ctrl-C, service shutdown).
    Shutdown,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PeerClosed => write!(f, "closed by peer"),
            Self::UserExit => write!(f, "exit requested"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Terminal result of a streaming loop.
///
/// Loops never propagate errors past their boundary; a fatal error is
/// reported as `Failed` instead.
#[derive(Debug)]
pub enum StreamOutcome {
    Closed(CloseReason),
    Failed(StreamError),
}

impl StreamOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The close reason, if the stream ended cleanly.
    pub fn close_reason(&self) -> Option<CloseReason> {
        match self {
            Self::Closed(reason) => Some(*reason),
            Self::Failed(_) => None,
        }
    }

    /// Convert into a `Result`, for callers that want `?`.
    pub fn into_result(self) -> Result<CloseReason, StreamError> {
        match self {
            Self::Closed(reason) => Ok(reason),
            Self::Failed(e) => Err(e),
        }
    }
}

// ── StreamPhase ──────────────────────────────────────────────────

/// The current phase of a producer or consumer connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamPhase {
    /// Nothing started yet.
    #[default]
    Idle,

    /// Producer: bound and waiting for the consumer to connect.
    Listening,

    /// Consumer: TCP connect in progress.
    Connecting,

    /// Connection open; frames flowing.
    Streaming {
        /// When streaming began.
        since: Instant,
    },

    /// Ended without error.
    Closed(CloseReason),

    /// Ended on a fatal error.
    Failed,
}

impl std::fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Listening => write!(f, "Listening"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Streaming { .. } => write!(f, "Streaming"),
            Self::Closed(_) => write!(f, "Closed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

impl StreamPhase {
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming { .. })
    }

    /// `Closed` or `Failed`: no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed(_) | Self::Failed)
    }

    /// How long the stream has been running; `None` outside `Streaming`.
    pub fn streaming_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Streaming { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Listening`.
    ///
    /// Valid from: `Idle`.
    pub fn begin_listen(&mut self) -> Result<(), StreamError> {
        match self {
            Self::Idle => {
                *self = Self::Listening;
                Ok(())
            }
            _ => Err(StreamError::InvalidTransition(format!("cannot listen from {self}"))),
        }
    }

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Idle`.
    pub fn begin_connect(&mut self) -> Result<(), StreamError> {
        match self {
            Self::Idle => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(StreamError::InvalidTransition(format!("cannot connect from {self}"))),
        }
    }

    /// Transition to `Streaming`.
    ///
    /// Valid from: `Listening`, `Connecting`.
    pub fn start_streaming(&mut self) -> Result<(), StreamError> {
        match self {
            Self::Listening | Self::Connecting => {
                *self = Self::Streaming {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(StreamError::InvalidTransition(format!(
                "cannot start streaming from {self}"
            ))),
        }
    }

    /// Record the loop's outcome: `Closed` or `Failed`.
    ///
    /// Valid from: `Streaming`.
    pub fn finish(&mut self, outcome: &StreamOutcome) -> Result<(), StreamError> {
        if !self.is_streaming() {
            return Err(StreamError::InvalidTransition(format!("cannot finish from {self}")));
        }
        *self = match outcome {
            StreamOutcome::Closed(reason) => Self::Closed(*reason),
            StreamOutcome::Failed(_) => Self::Failed,
        };
        Ok(())
    }

    /// Force `Failed` regardless of the current phase.
    ///
    /// Use this when setup (bind, resolve, connect) fails before any
    /// frame flows.
    pub fn fail(&mut self) {
        *self = Self::Failed;
    }
}

// ── Tests ────────────────────────────────────────────────────────
