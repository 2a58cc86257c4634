//! Client configuration

use serde::{Deserialize, Serialize};

use crate::cue::CueMatchPolicy;
use crate::error::{Result, SyncError};

/// Two gibibytes, the server's per-file limit.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted file size in bytes
    pub max_file_size: u64,

    /// Size of each body chunk handed to the HTTP client, in bytes
    pub chunk_size: usize,

    /// Timeout for establishing the connection, in seconds
    pub connect_timeout_secs: u64,

    /// An upload fails once no body bytes have moved for this many seconds
    pub idle_timeout_secs: u64,

    /// Time allowed for the response after the last body byte, in seconds
    pub response_timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            chunk_size: 1024 * 1024, // 1 MiB, same as the server's write chunk
            connect_timeout_secs: 10,
            idle_timeout_secs: 60,
            response_timeout_secs: 300,
        }
    }
}

/// Player configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Seconds skipped by the seek shortcuts
    pub seek_step_secs: f64,

    /// Volume change applied by the volume shortcuts
    pub volume_step: f64,

    /// Initial volume in [0, 1]
    pub initial_volume: f64,

    /// Which cue wins when several are active at once
    pub cue_match: CueMatchPolicy,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            seek_step_secs: 5.0,
            volume_step: 0.1,
            initial_volume: 1.0,
            cue_match: CueMatchPolicy::FirstMatch,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the sync server, without trailing slash
    pub base_url: String,

    /// Upload configuration
    pub upload: UploadConfig,

    /// Player configuration
    pub player: PlayerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            upload: UploadConfig::default(),
            player: PlayerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a default configuration pointing at `base_url`
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    /// Build an absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &str) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| SyncError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
