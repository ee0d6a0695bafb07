use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream, lookup_host};
use tracing::{info, warn};

use crate::error::StreamError;

/// Default TCP port shared by server and viewer.
pub const DEFAULT_PORT: u16 = 9999;

/// Default connect timeout for the viewer.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Host and port of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    host: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ── Producer side ────────────────────────────────────────────────

/// Bind a listener on `info`.
pub async fn bind(info: &ConnectionInfo) -> Result<TcpListener, StreamError> {
    let listener = TcpListener::bind((info.host(), info.port())).await?;
    info!(addr = %listener.local_addr()?, "listening");
    Ok(listener)
}

/// Wait for exactly one consumer to connect.
pub async fn accept_one(listener: &TcpListener) -> Result<(TcpStream, SocketAddr), StreamError> {
    let (stream, peer) = listener.accept().await?;
    stream.set_nodelay(true)?;
    info!(%peer, "connection established");
    Ok((stream, peer))
}

// ── Consumer side ────────────────────────────────────────────────

/// Resolve `info` and connect to the first address that answers within
/// `timeout`.
///
/// Failures keep their class: [`StreamError::Resolve`] when the host
/// has no address, [`StreamError::Timeout`] when nothing answered in
/// time, and [`StreamError::Transport`] otherwise (e.g. refused).
pub async fn connect(info: &ConnectionInfo, timeout: Duration) -> Result<TcpStream, StreamError> {
    info!(server = %info, "connecting");

    let addrs: Vec<SocketAddr> = lookup_host((info.host(), info.port()))
        .await
        .map_err(|source| StreamError::Resolve {
            host: info.host().to_string(),
            source,
        })?
        .collect();

    if addrs.is_empty() {
        return Err(StreamError::Resolve {
            host: info.host().to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
        });
    }

    let mut last_err = StreamError::Timeout(timeout);
    for addr in addrs {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                stream.set_nodelay(true)?;
                info!(peer = %addr, "connected");
                return Ok(stream);
            }
            Ok(Err(e)) => {
                warn!(%addr, "connect failed: {e}");
                last_err = e.into();
            }
            Err(_) => {
                warn!(%addr, ?timeout, "connect timed out");
                last_err = StreamError::Timeout(timeout);
            }
        }
    }
    Err(last_err)
}

/// One-line operator hint for a failed [`connect`].
pub fn connect_hint(err: &StreamError) -> &'static str {
    match err {
        StreamError::Transport(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
            "connection refused; is the server running and the port correct?"
        }
        StreamError::Resolve { .. } => "cannot resolve the server host name",
        StreamError::Timeout(_) => "timed out while connecting to the server",
        _ => "unexpected error while connecting",
    }
}

// ── Tests ────────────────────────────────────────────────────────
