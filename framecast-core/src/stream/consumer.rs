//! Consumer-side streaming loop.
//!
//! Reads raw bytes from the connection into a [`ReceiveBuffer`], pulls
//! out every complete wire unit, decodes it and hands the image to a
//! [`DisplaySink`].
//!
//! A payload that fails to decode means the byte stream can no longer be
//! trusted, so the whole receive buffer is discarded and parsing starts
//! again from the next bytes read. An oversize length prefix gets the
//! same treatment.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::codec::{DEFAULT_MAX_PAYLOAD_SIZE, ReceiveBuffer, ReceivePhase, WireUnit};
use crate::error::StreamError;
use crate::state::{CloseReason, StreamOutcome};
use crate::stream::decoder::FrameDecoder;
use crate::stream::sink::DisplaySink;

/// Bytes requested from the connection per read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

/// Longest gap between two exit polls of the sink, whatever the
/// connection delivers.
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(50);

// ── ConsumerConfig ───────────────────────────────────────────────

/// Configuration for [`StreamConsumer`].
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub read_chunk_size: usize,
    /// Largest payload accepted before the stream is considered desynced.
    pub max_payload: usize,
    pub idle_poll: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_payload: DEFAULT_MAX_PAYLOAD_SIZE,
            idle_poll: DEFAULT_IDLE_POLL,
        }
    }
}

impl ConsumerConfig {
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.read_chunk_size == 0 {
            return Err(StreamError::Config("read_chunk_size must be > 0".into()));
        }
        if self.max_payload == 0 {
            return Err(StreamError::Config("max_payload must be > 0".into()));
        }
        if self.idle_poll.is_zero() {
            return Err(StreamError::Config("idle_poll must be non-zero".into()));
        }
        Ok(())
    }
}

/// Counters kept across one consumer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub frames_displayed: u64,
    pub decode_failures: u64,
    pub render_failures: u64,
    /// Times the receive buffer was discarded to resynchronise.
    pub desync_resets: u64,
    pub bytes_received: u64,
}

/// Where the consumer is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    AwaitingLength,
    AwaitingPayload,
    Decoding,
    Displaying,
}

enum Wake {
    Read(io::Result<usize>),
    Idle,
}

// ── StreamConsumer ───────────────────────────────────────────────

/// Receives, decodes and displays frames from one connection.
pub struct StreamConsumer<R, D, K> {
    reader: R,
    decoder: D,
    sink: K,
    buffer: ReceiveBuffer,
    config: ConsumerConfig,
    running: Arc<AtomicBool>,
    stats: ConsumerStats,
    frame_phase: FramePhase,
    last_exit_poll: Instant,
}

impl<R, D, K> StreamConsumer<R, D, K>
where
    R: AsyncRead + Unpin,
    D: FrameDecoder,
    K: DisplaySink,
{
    pub fn new(reader: R, decoder: D, sink: K, config: ConsumerConfig) -> Result<Self, StreamError> {
        config.validate()?;
        Ok(Self {
            reader,
            decoder,
            sink,
            buffer: ReceiveBuffer::new(config.max_payload),
            config,
            running: Arc::new(AtomicBool::new(true)),
            stats: ConsumerStats::default(),
            frame_phase: FramePhase::AwaitingLength,
            last_exit_poll: Instant::now(),
        })
    }

    /// A cloneable handle; storing `false` stops the loop at its next
    /// wake-up.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Share an existing stop handle (e.g. one owned by a service).
    pub fn with_stop_handle(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn stats(&self) -> &ConsumerStats {
        &self.stats
    }

    pub fn frame_phase(&self) -> FramePhase {
        self.frame_phase
    }

    /// Bytes received but not yet consumed as part of a wire unit.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Run the receive loop until the peer closes, the user exits, or
    /// the connection fails.
    pub async fn run(&mut self) -> StreamOutcome {
        info!(
            chunk = self.config.read_chunk_size,
            max_payload = self.config.max_payload,
            "consumer streaming"
        );
        let mut chunk = vec![0u8; self.config.read_chunk_size];
        self.last_exit_poll = Instant::now();

        loop {
            if !self.running.load(Ordering::SeqCst) {
                info!("consumer stopped on request");
                return StreamOutcome::Closed(CloseReason::Shutdown);
            }

            // Data arriving faster than `idle_poll` must not starve the sink.
            if self.last_exit_poll.elapsed() >= self.config.idle_poll && self.poll_exit() {
                info!("exit requested while receiving");
                return StreamOutcome::Closed(CloseReason::UserExit);
            }

            // Drain everything already buffered before reading again.
            match self.buffer.try_extract() {
                Ok(Some(unit)) => {
                    if let Some(reason) = self.handle_unit(unit) {
                        return StreamOutcome::Closed(reason);
                    }
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(class = e.class(), "stream desynchronised: {e}; discarding buffer");
                    self.resync();
                    if self.poll_exit() {
                        info!("exit requested");
                        return StreamOutcome::Closed(CloseReason::UserExit);
                    }
                }
            }

            self.frame_phase = match self.buffer.phase() {
                ReceivePhase::AwaitingPayload { .. } => FramePhase::AwaitingPayload,
                _ => FramePhase::AwaitingLength,
            };

            let wake = tokio::select! {
                read = self.reader.read(&mut chunk) => Wake::Read(read),
                _ = tokio::time::sleep(self.config.idle_poll) => Wake::Idle,
            };

            match wake {
                Wake::Read(Ok(0)) => {
                    info!(buffered = self.buffer.len(), "connection closed by peer");
                    return StreamOutcome::Closed(CloseReason::PeerClosed);
                }
                Wake::Read(Ok(n)) => {
                    self.buffer.extend(&chunk[..n]);
                    self.stats.bytes_received += n as u64;
                }
                Wake::Read(Err(e)) => {
                    let e = StreamError::from(e);
                    error!(class = e.class(), "consumer stopped: {e}");
                    return StreamOutcome::Failed(e);
                }
                Wake::Idle => {
                    if self.poll_exit() {
                        info!("exit requested while idle");
                        return StreamOutcome::Closed(CloseReason::UserExit);
                    }
                }
            }
        }
    }

    /// Decode and present one unit. Returns a close reason if the user
    /// asked to exit.
    fn handle_unit(&mut self, unit: WireUnit) -> Option<CloseReason> {
        self.frame_phase = FramePhase::Decoding;
        let frame = match self.decoder.decode(unit.payload()) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.decode_failures += 1;
                warn!(
                    len = unit.length(),
                    buffered = self.buffer.len(),
                    "dropping undecodable frame: {e}; discarding buffer"
                );
                self.resync();
                return self.poll_exit().then(|| {
                    info!("exit requested");
                    CloseReason::UserExit
                });
            }
        };

        self.frame_phase = FramePhase::Displaying;
        match self.sink.present(&frame) {
            Ok(()) => {
                self.stats.frames_displayed += 1;
                debug!(
                    frame = self.stats.frames_displayed,
                    width = frame.width(),
                    height = frame.height(),
                    "frame displayed"
                );
            }
            Err(e) => {
                self.stats.render_failures += 1;
                warn!(class = e.class(), "render failed: {e}");
            }
        }

        if self.poll_exit() {
            info!("exit requested");
            return Some(CloseReason::UserExit);
        }
        None
    }

    /// Ask the sink whether the user wants out. Also services the sink's
    /// event queue.
    fn poll_exit(&mut self) -> bool {
        self.last_exit_poll = Instant::now();
        self.sink.exit_requested()
    }

    fn resync(&mut self) {
        self.buffer.reset();
        self.stats.desync_resets += 1;
        self.frame_phase = FramePhase::AwaitingLength;
    }
}

// ── Tests ────────────────────────────────────────────────────────
