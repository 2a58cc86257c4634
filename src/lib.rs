//! WAV + WebVTT synchronizer client
//!
//! Uploads an audio file, its WebVTT subtitles and an optional cover image
//! to the sync server, then keeps the subtitle text in step with playback.
//!
//! The usual flow:
//! 1. Build an [`UploadOrchestrator`] over an [`HttpTransport`] and `submit`
//!    the files. Progress arrives on an optional channel.
//! 2. Hand the [`UploadOutcome`] to a [`PlaybackController`] and feed it the
//!    host player's time updates.
//! 3. Watch the subtitle channel from `subscribe_subtitles`.

pub mod config;
pub mod config_file;
pub mod cue;
pub mod error;
pub mod logging;
pub mod playback;
pub mod settings;
pub mod upload;

#[cfg(test)]
mod integration;

pub use config::ClientConfig;
pub use cue::{Cue, CueIndex, CueMatchPolicy};
pub use error::{MediaError, Result, SyncError, ValidationError};
pub use playback::{PlaybackController, PlayerAction, PlayerState};
pub use settings::AppearanceSettings;
pub use upload::{
    HttpTransport, ProgressEvent, UploadFile, UploadKind, UploadOrchestrator, UploadOutcome,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
