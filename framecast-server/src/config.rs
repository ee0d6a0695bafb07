//! Configuration for the framecast server.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use framecast_core::codec::{DEFAULT_MAX_PAYLOAD_SIZE, MAX_PAYLOAD_LIMIT};
use framecast_core::network::{ConnectionInfo, DEFAULT_PORT};
use framecast_core::stream::{CaptureRegion, CaptureSettings, DEFAULT_JPEG_QUALITY};
use framecast_core::ProducerConfig;

/// Errors raised while validating or writing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("port must be non-zero")]
    InvalidPort,

    #[error("jpeg_quality must be between 1 and 100, got {0}")]
    InvalidQuality(u8),

    #[error("capture region must have a non-zero width and height")]
    EmptyRegion,

    #[error("max_frame_bytes must be between 1 and {max}, got {got}")]
    InvalidFrameLimit { got: usize, max: usize },

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

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub network: NetworkConfig,
    pub screen: ScreenConfig,
    pub encoding: EncodingConfig,
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to listen on; "0.0.0.0" accepts from any interface.
    pub bind_address: String,
    /// TCP port the viewer connects to.
    pub port: u16,
}

/// Screen capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Monitor index to capture (0 = primary).
    pub monitor_index: u32,
    /// Optional crop of the monitor; the whole monitor when absent.
    pub region: Option<RegionConfig>,
    /// DXGI acquire timeout in milliseconds.
    pub capture_timeout_ms: u32,
}

/// Crop rectangle in monitor pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Encoding and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// JPEG quality, 1–100.
    pub jpeg_quality: u8,
    /// Minimum delay between frames in milliseconds (0 = unthrottled).
    pub frame_delay_ms: u64,
    /// Largest encoded frame the server will send.
    pub max_frame_bytes: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            monitor_index: 0,
            region: None,
            capture_timeout_ms: 100,
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            frame_delay_ms: 0,
            max_frame_bytes: DEFAULT_MAX_PAYLOAD_SIZE,
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

impl ServerConfig {
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

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, Self::default_toml()?)?;
        Ok(())
    }

    /// Reject values no session could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        let quality = self.encoding.jpeg_quality;
        if !(1..=100).contains(&quality) {
            return Err(ConfigError::InvalidQuality(quality));
        }
        if let Some(region) = &self.screen.region {
            if region.width == 0 || region.height == 0 {
                return Err(ConfigError::EmptyRegion);
            }
        }
        let limit = self.encoding.max_frame_bytes;
        if limit == 0 || limit > MAX_PAYLOAD_LIMIT {
            return Err(ConfigError::InvalidFrameLimit {
                got: limit,
                max: MAX_PAYLOAD_LIMIT,
            });
        }
        Ok(())
    }

    pub fn listen_info(&self) -> ConnectionInfo {
        ConnectionInfo::new(self.network.bind_address.clone(), self.network.port)
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            monitor_index: self.screen.monitor_index,
            region: self
                .screen
                .region
                .map(|r| CaptureRegion::new(r.x, r.y, r.width, r.height)),
            timeout_ms: self.screen.capture_timeout_ms,
        }
    }

    pub fn to_producer_config(&self) -> ProducerConfig {
        ProducerConfig {
            frame_delay: Duration::from_millis(self.encoding.frame_delay_ms),
            max_payload: self.encoding.max_frame_bytes,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = ServerConfig::default_toml().unwrap();
        assert!(text.contains("port = 9999"));
        assert!(text.contains("jpeg_quality = 75"));
        assert!(!text.contains("region"));
    }

    #[test]
    fn roundtrip_config() {
        let text = ServerConfig::default_toml().unwrap();
        let parsed = ServerConfig::parse(&text).unwrap();
        assert_eq!(parsed.network.port, 9999);
        assert_eq!(parsed.network.bind_address, "0.0.0.0");
        assert_eq!(parsed.encoding.jpeg_quality, 75);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = ServerConfig::parse(
            r#"
            [network]
            port = 7000

            [screen]
            region = { x = 10, y = 20, width = 640, height = 480 }
            "#,
        )
        .unwrap();
        assert_eq!(cfg.network.port, 7000);
        assert_eq!(cfg.network.bind_address, "0.0.0.0");
        assert_eq!(cfg.encoding.jpeg_quality, 75);

        let settings = cfg.capture_settings();
        assert_eq!(settings.region, Some(CaptureRegion::new(10, 20, 640, 480)));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = ServerConfig::default();
        cfg.encoding.jpeg_quality = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidQuality(0))));

        let mut cfg = ServerConfig::default();
        cfg.network.port = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidPort)));

        let mut cfg = ServerConfig::default();
        cfg.screen.region = Some(RegionConfig {
            x: 0,
            y: 0,
            width: 0,
            height: 10,
        });
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyRegion)));

        let mut cfg = ServerConfig::default();
        cfg.encoding.max_frame_bytes = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidFrameLimit { .. })
        ));
    }

    #[test]
    fn producer_config_from_encoding() {
        let mut cfg = ServerConfig::default();
        cfg.encoding.frame_delay_ms = 40;
        let producer = cfg.to_producer_config();
        assert_eq!(producer.frame_delay, Duration::from_millis(40));
        assert_eq!(producer.max_payload, DEFAULT_MAX_PAYLOAD_SIZE);
    }

    #[test]
    fn load_missing_file_is_none() {
        let cfg = ServerConfig::load(Path::new("/nonexistent/framecast-server.toml")).unwrap();
        assert!(cfg.is_none());
        assert_eq!(cfg.unwrap_or_default().network.port, 9999);
    }

    #[test]
    fn write_default_then_load() {
        let path = std::env::temp_dir().join(format!("framecast-server-{}.toml", std::process::id()));
        ServerConfig::write_default(&path).unwrap();
        let loaded = ServerConfig::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(loaded.unwrap().unwrap().validate().is_ok());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path =
            std::env::temp_dir().join(format!("framecast-server-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[network]\nport = \"not a number\"\n").unwrap();
        let loaded = ServerConfig::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(loaded, Err(ConfigError::Parse { .. })));
    }
}
