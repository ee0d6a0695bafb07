//! Connection lifecycle state.

pub mod phase;

pub use phase::{CloseReason, StreamOutcome, StreamPhase};
