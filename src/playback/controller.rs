//! Playback controller
//!
//! Owns the playback clock and the cue index. Every time update and seek
//! re-resolves the active cue and publishes its text on a watch channel,
//! so subscribers only wake up when the displayed text actually changes.

use tokio::sync::watch;

use super::clock::PlaybackClock;
use super::shortcuts::PlayerAction;
use super::{PlayerState, TransportState};
use crate::config::PlayerConfig;
use crate::cue::{Cue, CueIndex};
use crate::error::{MediaError, Result, SyncError};
use crate::upload::{UploadKind, UploadOutcome};

pub struct PlaybackController {
    state: PlayerState,
    clock: PlaybackClock,
    cues: CueIndex,
    source: Option<String>,
    image: Option<String>,
    fullscreen: bool,
    subtitle_tx: watch::Sender<String>,
}

impl PlaybackController {
    pub fn new(config: &PlayerConfig) -> Self {
        let (subtitle_tx, _) = watch::channel(String::new());
        Self {
            state: PlayerState::Empty,
            clock: PlaybackClock::new(config.initial_volume),
            cues: CueIndex::new(config.cue_match),
            source: None,
            image: None,
            fullscreen: false,
            subtitle_tx,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn cues(&self) -> &CueIndex {
        &self.cues
    }

    /// URL of the loaded audio source
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// URL of the image preview, if one is shown
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Receiver for the subtitle text; the current value is the text to display.
    pub fn subscribe_subtitles(&self) -> watch::Receiver<String> {
        self.subtitle_tx.subscribe()
    }

    pub fn current_subtitle(&self) -> String {
        self.subtitle_tx.borrow().clone()
    }

    /// Load a new audio source. Clears any previous error.
    pub fn load_source(&mut self, url: impl Into<String>) {
        let url = url.into();
        tracing::info!(%url, "Loading audio source");
        self.source = Some(url);
        self.clock.reset();
        self.state = PlayerState::Ready(TransportState::Paused);
        self.sync_subtitle();
    }

    /// Replace the cue index and republish for the current position
    pub fn load_cues(&mut self, cues: Vec<Cue>) {
        tracing::debug!(count = cues.len(), "Loading cues");
        self.cues.load(cues);
        self.sync_subtitle();
    }

    /// Set up playback for everything a submission produced
    pub fn load_outcome(&mut self, outcome: &UploadOutcome) -> Result<()> {
        let url = outcome.audio_url().ok_or_else(|| SyncError::Decode {
            kind: UploadKind::Audio,
            message: "no playback URL for the uploaded audio".to_string(),
        })?;
        self.load_source(url);
        self.load_cues(outcome.cues().to_vec());
        match outcome.image_url() {
            Some(image) => self.set_image(image),
            None => self.image = None,
        }
        Ok(())
    }

    /// Source metadata became available
    pub fn on_metadata(&mut self, duration: f64) {
        if !self.state.is_ready() {
            tracing::debug!(state = ?self.state, "Ignoring metadata");
            return;
        }
        self.clock.set_duration(duration);
        tracing::debug!(duration = ?self.clock.duration(), "Audio metadata loaded");
        self.sync_subtitle();
    }

    pub fn toggle_play_pause(&mut self) {
        let next = match self.state {
            PlayerState::Ready(TransportState::Paused) => TransportState::Playing,
            PlayerState::Ready(TransportState::Playing) => TransportState::Paused,
            state => {
                tracing::debug!(?state, "Ignoring play/pause");
                return;
            }
        };
        self.state = PlayerState::Ready(next);
        tracing::debug!(state = ?next, "Transport state changed");
    }

    pub fn seek_by(&mut self, delta: f64) {
        if self.guard("seek") {
            self.clock.seek_by(delta);
            self.sync_subtitle();
        }
    }

    pub fn seek_to(&mut self, time: f64) {
        if self.guard("seek") {
            self.clock.seek_to(time);
            self.sync_subtitle();
        }
    }

    /// Change the volume by `delta`
    pub fn set_volume(&mut self, delta: f64) {
        if self.guard("volume") {
            let volume = self.clock.adjust_volume(delta);
            tracing::debug!(volume, "Volume changed");
        }
    }

    pub fn toggle_mute(&mut self) {
        if self.guard("mute") {
            let muted = self.clock.toggle_mute();
            tracing::debug!(muted, "Mute toggled");
        }
    }

    /// Set the playback rate. Invalid rates are rejected in every state.
    pub fn set_rate(&mut self, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(SyncError::InvalidRate);
        }
        if self.guard("rate") {
            self.clock.set_rate(rate)?;
        }
        Ok(())
    }

    /// Toggle fullscreen presentation of the player
    pub fn toggle_fullscreen_presentation(&mut self) {
        if self.guard("fullscreen") {
            self.fullscreen = !self.fullscreen;
        }
    }

    /// Periodic position report from the host
    pub fn on_time_update(&mut self, time: f64) {
        if !self.state.is_ready() {
            return;
        }
        self.clock.seek_to(time);
        self.sync_subtitle();
    }

    /// End of stream. The subtitle is cleared even if a cue is still active.
    pub fn on_ended(&mut self) {
        if let PlayerState::Ready(_) = self.state {
            self.state = PlayerState::Ready(TransportState::Paused);
        }
        self.publish(String::new());
    }

    /// The source failed; playback stays errored until a new load.
    pub fn on_media_error(&mut self, code: u16) -> MediaError {
        let error = MediaError::from_code(code);
        tracing::warn!(code, error = %error, source = ?self.source, "Audio playback failed");
        self.state = PlayerState::Errored(error);
        self.publish(String::new());
        error
    }

    pub fn set_image(&mut self, url: impl Into<String>) {
        self.image = Some(url.into());
    }

    /// The preview failed to load; hide it and keep playing.
    pub fn on_image_error(&mut self) {
        if let Some(url) = self.image.take() {
            tracing::warn!(%url, "Image preview failed to load, hiding it");
        }
    }

    /// Dispatch a shortcut action. Nothing happens before a source is loaded.
    pub fn apply(&mut self, action: PlayerAction) {
        if self.state == PlayerState::Empty {
            tracing::debug!(?action, "Ignoring shortcut, no source loaded");
            return;
        }
        match action {
            PlayerAction::TogglePlayPause => self.toggle_play_pause(),
            PlayerAction::SeekBy(delta) => self.seek_by(delta),
            PlayerAction::AdjustVolume(delta) => self.set_volume(delta),
            PlayerAction::ToggleMute => self.toggle_mute(),
        }
    }

    fn guard(&self, op: &str) -> bool {
        if self.state.is_ready() {
            return true;
        }
        tracing::debug!(op, state = ?self.state, "Ignoring transport operation");
        false
    }

    fn sync_subtitle(&mut self) {
        let text = self.cues.text_at(self.clock.current_time()).to_string();
        self.publish(text);
    }

    fn publish(&self, text: String) {
        self.subtitle_tx.send_if_modified(|current| {
            if *current == text {
                return false;
            }
            *current = text;
            true
        });
    }
}
