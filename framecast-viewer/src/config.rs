//! Viewer configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use framecast_core::codec::{DEFAULT_MAX_PAYLOAD_SIZE, MAX_PAYLOAD_LIMIT};
use framecast_core::network::{ConnectionInfo, DEFAULT_PORT};
use framecast_core::stream::{ConsumerConfig, DEFAULT_IDLE_POLL, DEFAULT_READ_CHUNK_SIZE};

use crate::sink::virtual_key_for;

/// Errors raised while validating or writing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("server host must not be empty")]
    EmptyHost,

    #[error("server port must be non-zero")]
    InvalidPort,

    #[error("read_chunk_size must be greater than zero")]
    InvalidChunkSize,

    #[error("max_frame_bytes must be between 1 and {max}, got {got}")]
    InvalidFrameLimit { got: usize, max: usize },

    #[error("exit_key must be a letter or digit, got {0:?}")]
    InvalidExitKey(String),

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot serialise config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot write config: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub server: ServerConfig,
    pub stream: StreamConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Where to connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host name or IP address.
    pub host: String,
    pub port: u16,
    /// Connection timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Receive-side tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Bytes requested per socket read.
    pub read_chunk_size: usize,
    /// Largest frame accepted before the stream is treated as corrupt.
    pub max_frame_bytes: usize,
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    pub title: String,
    /// Key that closes the viewer; empty disables it.
    pub exit_key: String,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            timeout_ms: 5000,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_frame_bytes: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "framecast".into(),
            exit_key: "q".into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewerConfig {
    /// Load from a TOML file. `Ok(None)` when the file does not exist;
    /// a file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::parse(&contents)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// The default configuration as TOML text.
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, Self::default_toml()?)?;
        Ok(())
    }

    /// Reject values no session could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.stream.read_chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        let limit = self.stream.max_frame_bytes;
        if limit == 0 || limit > MAX_PAYLOAD_LIMIT {
            return Err(ConfigError::InvalidFrameLimit {
                got: limit,
                max: MAX_PAYLOAD_LIMIT,
            });
        }
        self.exit_key()?;
        Ok(())
    }

    /// Virtual-key code of the configured exit key, if any.
    pub fn exit_key(&self) -> Result<Option<u16>, ConfigError> {
        let key = self.display.exit_key.trim();
        if key.is_empty() {
            return Ok(None);
        }
        let mut chars = key.chars();
        match (chars.next().and_then(virtual_key_for), chars.next()) {
            (Some(vk), None) => Ok(Some(vk)),
            _ => Err(ConfigError::InvalidExitKey(key.to_string())),
        }
    }

    pub fn server_info(&self) -> ConnectionInfo {
        ConnectionInfo::new(self.server.host.clone(), self.server.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.server.timeout_ms)
    }

    pub fn to_consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            read_chunk_size: self.stream.read_chunk_size,
            max_payload: self.stream.max_frame_bytes,
            idle_poll: DEFAULT_IDLE_POLL,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
