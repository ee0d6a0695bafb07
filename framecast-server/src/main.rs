//! framecast-server: entry point.
//!
//! ```text
//! framecast-server                  Serve with config file / defaults
//! framecast-server --config <path>  Load a custom config TOML
//! framecast-server --gen-config     Write default config to stdout
//! framecast-server --port 9999      Override the listen port
//! ```

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use framecast_core::stream::DxgiCapturer;
use framecast_server::config::ServerConfig;
use framecast_server::service::ScreenServer;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "framecast-server", about = "Stream this machine's screen to one viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "framecast-server.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Override the listen address.
    #[arg(long)]
    bind: Option<String>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the JPEG quality (1-100).
    #[arg(short, long)]
    quality: Option<u8>,

    /// Override the monitor index.
    #[arg(short, long)]
    monitor: Option<u32>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        println!("{}", ServerConfig::default_toml()?);
        return Ok(());
    }

    let loaded = ServerConfig::load(&cli.config);
    let found = matches!(loaded, Ok(Some(_)));
    let mut config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.network.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(quality) = cli.quality {
        config.encoding.jpeg_quality = quality;
    }
    if let Some(monitor) = cli.monitor {
        config.screen.monitor_index = monitor;
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

    info!("framecast-server v{}", env!("CARGO_PKG_VERSION"));
    info!("listen address: {}", config.listen_info());
    info!("jpeg quality: {}", config.encoding.jpeg_quality);
    info!("monitor: {}", config.screen.monitor_index);

    let mut server = ScreenServer::new(config, DxgiCapturer::new);
    let stop = server.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, Ordering::SeqCst);
    });

    match server.run().await {
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
