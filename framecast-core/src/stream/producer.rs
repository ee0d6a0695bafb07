//! Producer-side streaming loop.
//!
//! Orchestrates the capture pipeline for one open connection:
//!
//! 1. [`FrameSource`] acquires a raw frame of the configured region.
//! 2. [`FrameEncoder`] compresses it.
//! 3. [`codec::encode`] wraps the payload in a length prefix.
//! 4. The whole wire unit is written to the connection.
//!
//! The loop runs until the connection fails, the source fails, or the
//! stop handle is cleared. Back-pressure comes from the awaited write:
//! a slow consumer stalls the next capture.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::codec::{self, DEFAULT_MAX_PAYLOAD_SIZE};
use crate::error::StreamError;
use crate::state::{CloseReason, StreamOutcome};
use crate::stream::capture::FrameSource;
use crate::stream::encoder::FrameEncoder;

// ── ProducerConfig ───────────────────────────────────────────────

/// Configuration for [`StreamProducer`].
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Minimum time between the start of two frames. Zero sends as fast
    /// as capture, encode and the socket allow.
    pub frame_delay: Duration,
    /// Encoded frames above this size are skipped instead of sent.
    pub max_payload: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            frame_delay: Duration::ZERO,
            max_payload: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

/// Counters kept across one producer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducerStats {
    /// Wire units written in full.
    pub frames_sent: u64,
    /// Frames dropped because encoding failed.
    pub frames_skipped: u64,
    /// Bytes written, prefixes included.
    pub bytes_sent: u64,
}

// ── StreamProducer ───────────────────────────────────────────────

/// Captures, encodes and sends frames over one connection.
pub struct StreamProducer<S, E, W> {
    source: S,
    encoder: E,
    writer: W,
    running: Arc<AtomicBool>,
    config: ProducerConfig,
    stats: ProducerStats,
}

impl<S, E, W> StreamProducer<S, E, W>
where
    S: FrameSource,
    E: FrameEncoder,
    W: AsyncWrite + Unpin,
{
    pub fn new(source: S, encoder: E, writer: W, config: ProducerConfig) -> Self {
        Self {
            source,
            encoder,
            writer,
            running: Arc::new(AtomicBool::new(true)),
            config,
            stats: ProducerStats::default(),
        }
    }

    /// A cloneable handle; storing `false` stops the loop after the
    /// current frame.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Share an existing stop handle (e.g. one owned by a service).
    pub fn with_stop_handle(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    /// Signal the loop to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> &ProducerStats {
        &self.stats
    }

    /// Run the streaming loop until it closes or fails.
    ///
    /// Errors never escape: a fatal one is returned as
    /// [`StreamOutcome::Failed`].
    pub async fn run(&mut self) -> StreamOutcome {
        info!(interval = ?self.config.frame_delay, "producer streaming");

        while self.running.load(Ordering::SeqCst) {
            let loop_start = Instant::now();

            match self.send_next().await {
                Ok(sent) => {
                    self.stats.frames_sent += 1;
                    self.stats.bytes_sent += sent as u64;
                    debug!(frame = self.stats.frames_sent, bytes = sent, "frame sent");
                }
                Err(StreamError::Timeout(_)) => {
                    // No new desktop frame within the deadline.
                    tokio::task::yield_now().await;
                    continue;
                }
                Err(e) if e.is_fatal() => {
                    error!(class = e.class(), "producer stopped: {e}");
                    return StreamOutcome::Failed(e);
                }
                Err(e) => {
                    self.stats.frames_skipped += 1;
                    warn!(class = e.class(), "frame skipped: {e}");
                }
            }

            Self::pace(loop_start, self.config.frame_delay).await;
        }

        info!("producer stopped on request");
        StreamOutcome::Closed(CloseReason::Shutdown)
    }

    /// Capture, encode, frame and write one unit; returns bytes written.
    async fn send_next(&mut self) -> Result<usize, StreamError> {
        let frame = self.source.capture()?;
        let payload = self.encoder.encode(&frame)?;
        if payload.len() > self.config.max_payload {
            return Err(StreamError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload,
            });
        }
        let wire = codec::encode(&payload)?;

        self.writer.write_all(&wire).await?;
        self.writer.flush().await?;
        Ok(wire.len())
    }

    /// Sleep for the remainder of the frame interval.
    async fn pace(loop_start: Instant, interval: Duration) {
        let elapsed = loop_start.elapsed();
        if elapsed < interval {
            tokio::time::sleep(interval - elapsed).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;

    use super::*;
    use crate::stream::types::{PixelBuffer, PixelFormat};

    struct ScriptedSource(VecDeque<Result<PixelBuffer, StreamError>>);

    impl ScriptedSource {
        fn frames(values: &[u8]) -> Self {
            Self(values.iter().map(|&v| Ok(pixel(v))).collect())
        }
    }

    impl FrameSource for ScriptedSource {
        fn capture(&mut self) -> Result<PixelBuffer, StreamError> {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(StreamError::Capture("display unavailable".into())))
        }
    }

    /// Emits the first pixel byte as a one-byte payload; 0xBA fails.
    struct ByteEncoder;

    impl FrameEncoder for ByteEncoder {
        fn encode(&mut self, frame: &PixelBuffer) -> Result<Vec<u8>, StreamError> {
            match frame.data()[0] {
                0xBA => Err(StreamError::Encode("encoder produced no output".into())),
                v => Ok(vec![v]),
            }
        }
    }

    /// Pads odd values to two bytes.
    struct WideEncoder;

    impl FrameEncoder for WideEncoder {
        fn encode(&mut self, frame: &PixelBuffer) -> Result<Vec<u8>, StreamError> {
            let v = frame.data()[0];
            Ok(if v % 2 == 1 { vec![v, 0] } else { vec![v] })
        }
    }

    fn pixel(v: u8) -> PixelBuffer {
        PixelBuffer::new(1, 1, PixelFormat::Rgb8, vec![v, v, v]).unwrap()
    }

    fn wire(v: u8) -> Vec<u8> {
        codec::encode(&[v]).unwrap()
    }

    #[tokio::test]
    async fn connection_lost_mid_stream_fails_loop() {
        let writer = tokio_test::io::Builder::new()
            .write(&wire(1))
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))
            .build();
        let mut producer = StreamProducer::new(
            ScriptedSource::frames(&[1, 2, 3]),
            ByteEncoder,
            writer,
            ProducerConfig::default(),
        );

        let outcome = producer.run().await;
        match outcome {
            StreamOutcome::Failed(StreamError::Transport(e)) => {
                assert_eq!(e.kind(), io::ErrorKind::BrokenPipe)
            }
            other => panic!("expected transport failure, got {other:?}"),
        }
        assert_eq!(producer.stats().frames_sent, 1);
        assert_eq!(producer.stats().bytes_sent, 5);
    }

    #[tokio::test]
    async fn encode_failure_skips_frame() {
        let writer = tokio_test::io::Builder::new()
            .write(&wire(1))
            .write(&wire(3))
            .build();
        let mut producer = StreamProducer::new(
            ScriptedSource::frames(&[1, 0xBA, 3]),
            ByteEncoder,
            writer,
            ProducerConfig::default(),
        );

        let outcome = producer.run().await;
        assert!(matches!(outcome, StreamOutcome::Failed(StreamError::Capture(_))));
        assert_eq!(
            producer.stats(),
            &ProducerStats {
                frames_sent: 2,
                frames_skipped: 1,
                bytes_sent: 10,
            }
        );
    }

    #[tokio::test]
    async fn capture_failure_is_terminal() {
        let writer = tokio_test::io::Builder::new().build();
        let mut producer = StreamProducer::new(
            ScriptedSource(VecDeque::new()),
            ByteEncoder,
            writer,
            ProducerConfig::default(),
        );

        let outcome = producer.run().await;
        assert!(matches!(outcome, StreamOutcome::Failed(StreamError::Capture(_))));
        assert_eq!(producer.stats().frames_sent, 0);
    }

    #[tokio::test]
    async fn capture_timeout_is_retried() {
        let mut script = VecDeque::new();
        script.push_back(Err(StreamError::Timeout(Duration::from_millis(100))));
        script.push_back(Err(StreamError::Timeout(Duration::from_millis(100))));
        script.push_back(Ok(pixel(7)));

        let writer = tokio_test::io::Builder::new().write(&wire(7)).build();
        let mut producer = StreamProducer::new(
            ScriptedSource(script),
            ByteEncoder,
            writer,
            ProducerConfig::default(),
        );

        let outcome = producer.run().await;
        assert!(matches!(outcome, StreamOutcome::Failed(StreamError::Capture(_))));
        assert_eq!(producer.stats().frames_sent, 1);
    }

    #[tokio::test]
    async fn stop_handle_closes_cleanly() {
        let writer = tokio_test::io::Builder::new().build();
        let mut producer = StreamProducer::new(
            ScriptedSource::frames(&[1]),
            ByteEncoder,
            writer,
            ProducerConfig::default(),
        );
        producer.stop_handle().store(false, Ordering::SeqCst);
        assert!(!producer.is_running());

        let outcome = producer.run().await;
        assert_eq!(outcome.close_reason(), Some(CloseReason::Shutdown));
        assert_eq!(producer.stats(), &ProducerStats::default());
    }

    #[tokio::test]
    async fn oversize_payload_is_skipped() {
        let writer = tokio_test::io::Builder::new().write(&wire(2)).build();
        let mut producer = StreamProducer::new(
            ScriptedSource::frames(&[1, 2]),
            WideEncoder,
            writer,
            ProducerConfig {
                max_payload: 1,
                ..ProducerConfig::default()
            },
        );

        producer.run().await;
        assert_eq!(producer.stats().frames_skipped, 1);
        assert_eq!(producer.stats().frames_sent, 1);
    }

    #[tokio::test]
    async fn frame_delay_paces_sends() {
        let (writer, _reader) = tokio::io::duplex(1024);
        let mut producer = StreamProducer::new(
            ScriptedSource::frames(&[1, 2, 3]),
            ByteEncoder,
            writer,
            ProducerConfig {
                frame_delay: Duration::from_millis(20),
                ..ProducerConfig::default()
            },
        );

        let started = Instant::now();
        let outcome = producer.run().await;
        assert!(outcome.is_failed());
        assert_eq!(producer.stats().frames_sent, 3);
        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}
