//! Playback clock

use crate::error::{Result, SyncError};

/// Position, duration, rate and volume of the loaded source.
///
/// `current_time` stays within `[0, duration]`. Until metadata arrives the
/// duration is unknown and only the lower bound applies.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    current_time: f64,
    duration: Option<f64>,
    rate: f64,
    volume: f64,
    muted: bool,
}

impl PlaybackClock {
    pub fn new(volume: f64) -> Self {
        Self {
            current_time: 0.0,
            duration: None,
            rate: 1.0,
            volume: clamp_volume(volume),
            muted: false,
        }
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Volume the output should actually use
    pub fn effective_volume(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    /// Rewind for a new source. Volume, mute and rate carry over.
    pub fn reset(&mut self) {
        self.current_time = 0.0;
        self.duration = None;
    }

    /// Record the source duration; invalid values leave it unknown.
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = (duration.is_finite() && duration >= 0.0).then_some(duration);
        self.current_time = self.clamp_time(self.current_time);
    }

    /// Move to `time`, clamped to the valid range. Returns the new position.
    pub fn seek_to(&mut self, time: f64) -> f64 {
        if !time.is_nan() {
            self.current_time = self.clamp_time(time);
        }
        self.current_time
    }

    pub fn seek_by(&mut self, delta: f64) -> f64 {
        self.seek_to(self.current_time + delta)
    }

    /// Change the volume by `delta`, clamped to `[0, 1]`
    pub fn adjust_volume(&mut self, delta: f64) -> f64 {
        if !delta.is_nan() {
            self.volume = clamp_volume(self.volume + delta);
        }
        self.volume
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn set_rate(&mut self, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(SyncError::InvalidRate);
        }
        self.rate = rate;
        Ok(())
    }

    fn clamp_time(&self, time: f64) -> f64 {
        let time = time.max(0.0);
        match self.duration {
            Some(duration) => time.min(duration),
            None => time,
        }
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        return 1.0;
    }
    // Round away accumulated float error from repeated 0.1 steps
    ((volume * 1000.0).round() / 1000.0).clamp(0.0, 1.0)
}
