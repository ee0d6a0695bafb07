//! # framecast-core
//!
//! Core library for framecast, a one-way screen streaming protocol.
//!
//! This crate contains:
//! - **Codec**: length-prefixed framing (`encode`, `try_extract`,
//!   `ReceiveBuffer`, `WireCodec` for `tokio_util`)
//! - **Stream**: the producer (capture → encode → send) and consumer
//!   (receive → decode → display) loops and their collaborator traits
//! - **Network**: listener / connector helpers with typed diagnostics
//! - **State**: connection lifecycle (`StreamPhase`, `StreamOutcome`)
//! - **Error**: `StreamError`, a typed `thiserror`-based error hierarchy

pub mod codec;
pub mod error;
pub mod network;
pub mod state;
pub mod stream;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{
    DEFAULT_MAX_PAYLOAD_SIZE, LENGTH_PREFIX_SIZE, ReceiveBuffer, WireCodec, WireUnit,
};
pub use error::StreamError;
pub use network::ConnectionInfo;
pub use state::{CloseReason, StreamOutcome, StreamPhase};
pub use stream::{
    ConsumerConfig, ConsumerStats, DisplaySink, FrameDecoder, FrameEncoder, FrameSource,
    JpegDecoder, JpegEncoder, PixelBuffer, PixelFormat, ProducerConfig, ProducerStats,
    StreamConsumer, StreamProducer,
};
