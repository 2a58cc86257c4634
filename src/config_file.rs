//! Configuration file support
//!
//! Loads client configuration from TOML files where every section but
//! `[server]` may be omitted.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{ClientConfig, LoggingConfig, PlayerConfig, UploadConfig};
use crate::cue::CueMatchPolicy;
use crate::error::{Result, SyncError};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Upload settings
    pub upload: Option<UploadSettings>,
    /// Player settings
    pub player: Option<PlayerSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Base URL of the sync server
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Maximum file size in MB
    pub max_file_size_mb: Option<u64>,
    /// Body chunk size in KB
    pub chunk_size_kb: Option<usize>,
    /// Connect timeout in seconds
    pub connect_timeout_secs: Option<u64>,
    /// Seconds without upload progress before giving up
    pub idle_timeout_secs: Option<u64>,
    /// Seconds to wait for the response once the body is sent
    pub response_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSettings {
    pub seek_step_secs: Option<f64>,
    pub volume_step: Option<f64>,
    pub initial_volume: Option<f64>,
    /// first, last or longest
    pub cue_match: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| SyncError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        Self {
            server: ServerSettings {
                base_url: "http://127.0.0.1:8000".to_string(),
            },
            upload: Some(UploadSettings {
                max_file_size_mb: Some(2048),
                chunk_size_kb: Some(1024),
                connect_timeout_secs: Some(10),
                idle_timeout_secs: Some(60),
                response_timeout_secs: Some(300),
            }),
            player: Some(PlayerSettings {
                seek_step_secs: Some(5.0),
                volume_step: Some(0.1),
                initial_volume: Some(1.0),
                cue_match: Some("first".to_string()),
            }),
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Convert to ClientConfig
    pub fn into_client_config(self) -> Result<ClientConfig> {
        let upload_defaults = UploadConfig::default();
        let player_defaults = PlayerConfig::default();

        let upload = match self.upload {
            Some(u) => UploadConfig {
                max_file_size: match u.max_file_size_mb {
                    Some(mb) => scale(mb, 1024 * 1024, "max_file_size_mb")?,
                    None => upload_defaults.max_file_size,
                },
                chunk_size: match u.chunk_size_kb {
                    Some(kb) => {
                        let bytes = scale(kb.max(1) as u64, 1024, "chunk_size_kb")?;
                        usize::try_from(bytes).map_err(|_| {
                            SyncError::Config(format!("chunk_size_kb is too large: {}", kb))
                        })?
                    }
                    None => upload_defaults.chunk_size,
                },
                connect_timeout_secs: u
                    .connect_timeout_secs
                    .unwrap_or(upload_defaults.connect_timeout_secs),
                idle_timeout_secs: u
                    .idle_timeout_secs
                    .unwrap_or(upload_defaults.idle_timeout_secs),
                response_timeout_secs: u
                    .response_timeout_secs
                    .unwrap_or(upload_defaults.response_timeout_secs),
            },
            None => upload_defaults,
        };

        let player = match self.player {
            Some(p) => PlayerConfig {
                seek_step_secs: p.seek_step_secs.unwrap_or(player_defaults.seek_step_secs),
                volume_step: p.volume_step.unwrap_or(player_defaults.volume_step),
                initial_volume: p
                    .initial_volume
                    .unwrap_or(player_defaults.initial_volume)
                    .clamp(0.0, 1.0),
                cue_match: match p.cue_match {
                    Some(name) => name.parse::<CueMatchPolicy>()?,
                    None => player_defaults.cue_match,
                },
            },
            None => player_defaults,
        };

        let logging = self
            .logging
            .map(|l| LoggingConfig {
                level: l.level,
                format: l.format.unwrap_or_else(|| "pretty".to_string()),
            })
            .unwrap_or_default();

        Ok(ClientConfig {
            base_url: self.server.base_url.trim_end_matches('/').to_string(),
            upload,
            player,
            logging,
        })
    }
}

/// Convert a size in `unit`s to bytes
fn scale(value: u64, unit: u64, key: &str) -> Result<u64> {
    value
        .checked_mul(unit)
        .ok_or_else(|| SyncError::Config(format!("{} is too large: {}", key, value)))
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    ConfigFile::default_config().to_file(path)
}
