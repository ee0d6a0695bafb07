//! Server session logic.
//!
//! Binds the listener, waits for one viewer, opens the frame source and
//! runs the producer loop over the accepted connection until it ends.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::TcpListener;
use tracing::{error, info};

use framecast_core::network;
use framecast_core::stream::{CaptureSettings, FrameSource, JpegEncoder, StreamProducer};
use framecast_core::{CloseReason, StreamError, StreamPhase};

use crate::config::ServerConfig;

// ── ScreenServer ─────────────────────────────────────────────────

/// Serves one screen-streaming session.
///
/// `make_source` opens the frame source once a viewer has connected, so
/// a capture failure is reported against a live session.
pub struct ScreenServer<F> {
    config: ServerConfig,
    make_source: F,
    running: Arc<AtomicBool>,
    phase: StreamPhase,
}

impl<F, S> ScreenServer<F>
where
    F: FnMut(CaptureSettings) -> Result<S, StreamError>,
    S: FrameSource,
{
    pub fn new(config: ServerConfig, make_source: F) -> Self {
        Self {
            config,
            make_source,
            running: Arc::new(AtomicBool::new(true)),
            phase: StreamPhase::default(),
        }
    }

    /// Obtain a handle that can be used to stop the server from another
    /// task (e.g. the Ctrl-C handler).
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> &StreamPhase {
        &self.phase
    }

    /// Bind, serve one viewer, and return how the session ended.
    pub async fn run(&mut self) -> Result<CloseReason, StreamError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Bind the configured listen address.
    pub async fn bind(&mut self) -> Result<TcpListener, StreamError> {
        self.phase.begin_listen()?;
        network::bind(&self.config.listen_info()).await.inspect_err(|e| {
            error!(class = e.class(), "cannot start server: {e}");
            self.phase.fail();
        })
    }

    /// Accept one viewer on `listener` and stream to it.
    pub async fn serve(&mut self, listener: TcpListener) -> Result<CloseReason, StreamError> {
        let accepted = tokio::select! {
            result = network::accept_one(&listener) => Some(result),
            _ = Self::wait_for_stop(&self.running) => None,
        };
        let Some(accepted) = accepted else {
            info!("stopped before a viewer connected");
            self.phase = StreamPhase::Closed(CloseReason::Shutdown);
            return Ok(CloseReason::Shutdown);
        };
        let (stream, peer) = accepted.inspect_err(|_| self.phase.fail())?;
        drop(listener);
        self.phase.start_streaming()?;

        let settings = self.config.capture_settings();
        match &settings.region {
            Some(region) => info!(monitor = settings.monitor_index, ?region, "capturing region"),
            None => info!(monitor = settings.monitor_index, "capturing full monitor"),
        }

        let source = (self.make_source)(settings).inspect_err(|e| {
            error!(class = e.class(), "cannot open frame source: {e}");
            self.phase.fail();
        })?;
        let encoder = JpegEncoder::new(self.config.encoding.jpeg_quality)
            .inspect_err(|_| self.phase.fail())?;

        let mut producer =
            StreamProducer::new(source, encoder, stream, self.config.to_producer_config())
                .with_stop_handle(Arc::clone(&self.running));
        let outcome = producer.run().await;

        let stats = producer.stats();
        info!(
            %peer,
            frames = stats.frames_sent,
            skipped = stats.frames_skipped,
            bytes = stats.bytes_sent,
            duration = ?self.phase.streaming_duration(),
            "connection with viewer closed"
        );
        self.phase.finish(&outcome)?;
        outcome.into_result()
    }

    /// Resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use framecast_core::codec::ReceiveBuffer;
    use framecast_core::stream::{FrameDecoder, JpegDecoder, PixelBuffer, PixelFormat};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    struct FlatSource {
        remaining: usize,
    }

    impl FrameSource for FlatSource {
        fn capture(&mut self) -> Result<PixelBuffer, StreamError> {
            if self.remaining == 0 {
                return Err(StreamError::Capture("output lost".into()));
            }
            self.remaining -= 1;
            PixelBuffer::new(4, 4, PixelFormat::Bgra8, vec![0x80; 4 * 4 * 4])
        }
    }

    fn loopback_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.network.bind_address = "127.0.0.1".into();
        config.network.port = 0;
        config
    }

    #[test]
    fn server_starts_idle_and_running() {
        let server = ScreenServer::new(ServerConfig::default(), |_| {
            Ok(FlatSource { remaining: 0 })
        });
        assert!(server.is_running());
        assert_eq!(server.phase(), &StreamPhase::Idle);
        server.stop_handle().store(false, Ordering::SeqCst);
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn streams_frames_to_one_viewer() {
        let mut server = ScreenServer::new(loopback_config(), |settings: CaptureSettings| {
            assert_eq!(settings.monitor_index, 0);
            Ok(FlatSource { remaining: 2 })
        });
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert_eq!(server.phase(), &StreamPhase::Listening);

        let viewer = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let mut received = Vec::new();
            stream.read_to_end(&mut received).await.unwrap();
            received
        });

        let result = server.serve(listener).await;
        assert!(matches!(result, Err(StreamError::Capture(_))));
        assert_eq!(server.phase(), &StreamPhase::Failed);

        let bytes = viewer.await.unwrap();
        let mut buffer = ReceiveBuffer::new(1024 * 1024);
        buffer.extend(&bytes);
        let mut decoder = JpegDecoder::new();
        let mut frames = 0;
        while let Some(unit) = buffer.try_extract().unwrap() {
            let frame = decoder.decode(unit.payload()).unwrap();
            assert_eq!((frame.width(), frame.height()), (4, 4));
            frames += 1;
        }
        assert_eq!(frames, 2);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn source_failure_fails_session() {
        let mut server = ScreenServer::new(loopback_config(), |_| {
            Err::<FlatSource, _>(StreamError::Capture("no such monitor".into()))
        });
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();
        let viewer = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });

        let result = server.serve(listener).await;
        assert!(matches!(result, Err(StreamError::Capture(_))));
        assert_eq!(server.phase(), &StreamPhase::Failed);
        viewer.await.unwrap();
    }

    #[tokio::test]
    async fn stop_while_listening() {
        let mut server = ScreenServer::new(loopback_config(), |_| Ok(FlatSource { remaining: 0 }));
        let listener = server.bind().await.unwrap();
        server.stop();

        let reason = server.serve(listener).await.unwrap();
        assert_eq!(reason, CloseReason::Shutdown);
        assert_eq!(server.phase(), &StreamPhase::Closed(CloseReason::Shutdown));
    }
}
