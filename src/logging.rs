//! Logging setup for hosts embedding the client

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::{Result, SyncError};

/// Filter used when `RUST_LOG` is not set
fn default_filter(config: &LoggingConfig) -> String {
    format!("wsync_client={}", config.level)
}

/// Install a global subscriber. `RUST_LOG` overrides the configured level.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(config)))
        .map_err(|e| SyncError::Config(format!("invalid log filter: {}", e)))?;

    let fmt_layer = match config.format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().boxed(),
        "pretty" => tracing_subscriber::fmt::layer().boxed(),
        other => {
            return Err(SyncError::Config(format!(
                "unknown log format {:?}, expected \"json\" or \"pretty\"",
                other
            )))
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| SyncError::Config(format!("failed to install logger: {}", e)))
}
