//! Playback control and subtitle synchronization
//!
//! The host audio element reports time updates, metadata, end of stream
//! and errors to a [`PlaybackController`]; the controller owns the clock
//! and the cue index and publishes the subtitle text to subscribers.

pub mod clock;
pub mod controller;
pub mod shortcuts;

pub use clock::PlaybackClock;
pub use controller::PlaybackController;
pub use shortcuts::PlayerAction;

use crate::error::MediaError;

/// Whether a loaded source is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Paused,
    Playing,
}

/// Player lifecycle. `Errored` lasts until another source is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Empty,
    Ready(TransportState),
    Errored(MediaError),
}

impl PlayerState {
    pub fn is_ready(&self) -> bool {
        matches!(self, PlayerState::Ready(_))
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlayerState::Ready(TransportState::Playing))
    }
}
