//! Subtitle cue module
//!
//! This module handles timed subtitle entries:
//! - Cue type with half-open `[start, end)` timing
//! - CueIndex resolving the cue active at a playback position
//! - Local WebVTT parsing into cues

pub mod index;
pub mod vtt;

pub use index::{Cue, CueIndex, CueMatchPolicy};
pub use vtt::parse_vtt;
