//! # Streaming pipeline
//!
//! One producer pushes screen frames to one consumer over a single
//! byte-stream connection. Each frame travels as one length-prefixed
//! wire unit (see [`crate::codec`]).
//!
//! ```text
//! PRODUCER (captured machine)                 CONSUMER (viewer)
//! ┌─────────────────────────┐                ┌──────────────────────┐
//! │ FrameSource::capture    │                │ read chunk           │
//! │   ↓                     │                │   ↓                  │
//! │ FrameEncoder (JPEG)     │      TCP       │ ReceiveBuffer        │
//! │   ↓                     │ ──────────►    │   ↓                  │
//! │ codec::encode           │                │ FrameDecoder (JPEG)  │
//! │   ↓                     │                │   ↓                  │
//! │ write_all + flush       │                │ DisplaySink::present │
//! └─────────────────────────┘                └──────────────────────┘
//! ```
//!
//! ## Sub-modules
//!
//! | Module     | Purpose                                             |
//! |------------|-----------------------------------------------------|
//! | `types`    | Raw pixel buffers and capture regions               |
//! | `capture`  | `FrameSource` seam and DXGI Desktop Duplication     |
//! | `encoder`  | `FrameEncoder` seam and JPEG encoder                |
//! | `decoder`  | `FrameDecoder` seam and JPEG decoder                |
//! | `sink`     | `DisplaySink` seam                                  |
//! | `producer` | Capture → encode → write loop                       |
//! | `consumer` | Read → extract → decode → display loop              |

pub mod capture;
pub mod consumer;
pub mod decoder;
pub mod encoder;
pub mod producer;
pub mod sink;
pub mod types;

// ── Re-exports ───────────────────────────────────────────────────

pub use capture::{CaptureSettings, DxgiCapturer, FrameSource};
pub use consumer::{
    ConsumerConfig, ConsumerStats, DEFAULT_IDLE_POLL, DEFAULT_READ_CHUNK_SIZE, FramePhase,
    StreamConsumer,
};
pub use decoder::{FrameDecoder, JpegDecoder};
pub use encoder::{DEFAULT_JPEG_QUALITY, FrameEncoder, JpegEncoder};
pub use producer::{ProducerConfig, ProducerStats, StreamProducer};
pub use sink::DisplaySink;
pub use types::{CaptureRegion, PixelBuffer, PixelFormat};
