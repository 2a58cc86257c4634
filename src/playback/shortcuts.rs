//! Keyboard shortcuts

use crate::config::PlayerConfig;

/// A player command, usually triggered by a key press
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerAction {
    TogglePlayPause,
    /// Relative seek in seconds
    SeekBy(f64),
    /// Relative volume change
    AdjustVolume(f64),
    ToggleMute,
}

impl PlayerAction {
    /// Map a key name as reported by the host (`KeyboardEvent.key` naming).
    pub fn from_key(key: &str, config: &PlayerConfig) -> Option<Self> {
        let action = match key {
            " " | "Spacebar" => PlayerAction::TogglePlayPause,
            "ArrowLeft" => PlayerAction::SeekBy(-config.seek_step_secs),
            "ArrowRight" => PlayerAction::SeekBy(config.seek_step_secs),
            "ArrowUp" => PlayerAction::AdjustVolume(config.volume_step),
            "ArrowDown" => PlayerAction::AdjustVolume(-config.volume_step),
            "m" | "M" => PlayerAction::ToggleMute,
            _ => return None,
        };
        Some(action)
    }
}
