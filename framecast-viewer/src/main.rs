//! framecast-viewer: entry point.
//!
//! ```text
//! framecast-viewer                    Connect with defaults
//! framecast-viewer --config <path>    Use custom config TOML
//! framecast-viewer --server 10.0.0.2  Override the server host
//! framecast-viewer --gen-config       Dump default config and exit
//! ```

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use framecast_core::stream::{JpegDecoder, StreamConsumer};
use framecast_core::StreamPhase;

use framecast_viewer::config::ViewerConfig;
use framecast_viewer::connection::connect_to_server;
use framecast_viewer::display::DisplayRenderer;
use framecast_viewer::sink::WindowSink;
use framecast_viewer::window::{NativeWindow, surface_size};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "framecast-viewer", about = "View a framecast screen stream")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "framecast-viewer.toml")]
    config: PathBuf,

    /// Server host (overrides config).
    #[arg(short, long)]
    server: Option<String>,

    /// Server port (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", ViewerConfig::default_toml()?);
        return Ok(());
    }

    let loaded = ViewerConfig::load(&cli.config);
    let found = matches!(loaded, Ok(Some(_)));
    let mut config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => ViewerConfig::default(),
    };
    if let Some(host) = cli.server {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = loaded {
        error!("{e}");
        return Err(e.into());
    }
    if !found {
        info!("no config at {}; using defaults", cli.config.display());
    }

    config.validate()?;
    let exit_key = config.exit_key()?;

    info!("framecast-viewer v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Connect to the server ────────────────────────────────

    let mut phase = StreamPhase::default();
    phase.begin_connect()?;
    let stream = match connect_to_server(&config).await {
        Ok(stream) => stream,
        Err(e) => {
            phase.fail();
            return Err(e.into());
        }
    };
    info!("connected to {}", config.server_info());

    // ── 2. Create the window ────────────────────────────────────

    let window = NativeWindow::create(
        &config.display.title,
        config.display.width,
        config.display.height,
    )?;
    let (width, height) = surface_size(
        window.client_size(),
        (config.display.width, config.display.height),
    );
    let renderer = DisplayRenderer::new(window.hwnd(), width, height);
    let sink = WindowSink::new(window, renderer, exit_key);

    // ── 3. Receive loop ─────────────────────────────────────────

    let mut consumer =
        StreamConsumer::new(stream, JpegDecoder::new(), sink, config.to_consumer_config())?;
    let stop = consumer.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, Ordering::SeqCst);
    });

    phase.start_streaming()?;
    let outcome = consumer.run().await;

    let stats = consumer.stats();
    info!(
        frames = stats.frames_displayed,
        decode_failures = stats.decode_failures,
        desync_resets = stats.desync_resets,
        bytes = stats.bytes_received,
        duration = ?phase.streaming_duration(),
        "session statistics"
    );
    phase.finish(&outcome)?;

    match outcome.into_result() {
        Ok(reason) => {
            info!("streaming ended: {reason}");
            Ok(())
        }
        Err(e) => {
            error!(class = e.class(), "streaming ended: {e}");
            Err(e.into())
        }
    }
}
