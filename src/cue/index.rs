//! Cue index and active-cue resolution

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Result, SyncError};

/// A single subtitle cue, active over `[start, end)` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Start time in seconds (inclusive)
    pub start: f64,
    /// End time in seconds (exclusive)
    pub end: f64,
    /// Text content
    pub text: String,
}

impl Cue {
    /// Create a new cue. Returns `None` unless `start < end` and both are finite.
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Option<Self> {
        let cue = Self {
            start,
            end,
            text: text.into(),
        };
        cue.is_well_formed().then_some(cue)
    }

    pub fn is_well_formed(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start < self.end
    }

    /// Whether this cue should be displayed at `time`
    pub fn is_active(&self, time: f64) -> bool {
        self.start <= time && time < self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Tie-break used when several cues are active at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueMatchPolicy {
    /// The earliest cue in load order wins
    #[default]
    FirstMatch,
    /// The latest cue in load order wins
    LastMatch,
    /// The longest cue wins; equal lengths fall back to load order
    LongestMatch,
}

impl FromStr for CueMatchPolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_match" => Ok(CueMatchPolicy::FirstMatch),
            "last" | "last_match" => Ok(CueMatchPolicy::LastMatch),
            "longest" | "longest_match" => Ok(CueMatchPolicy::LongestMatch),
            other => Err(SyncError::Config(format!("unknown cue match policy: {}", other))),
        }
    }
}

/// Ordered cue list resolving "which cue is active at time t".
///
/// Queries are a linear scan in stored order. Tracks are expected to hold
/// hundreds of cues, not millions.
#[derive(Debug, Clone, Default)]
pub struct CueIndex {
    cues: Vec<Cue>,
    policy: CueMatchPolicy,
}

impl CueIndex {
    pub fn new(policy: CueMatchPolicy) -> Self {
        Self {
            cues: Vec::new(),
            policy,
        }
    }

    /// Build an index from WebVTT text
    pub fn from_vtt(content: &str, policy: CueMatchPolicy) -> Result<Self> {
        let mut index = Self::new(policy);
        index.load(super::vtt::parse_vtt(content)?);
        Ok(index)
    }

    /// Replace the whole cue list. The previous list is dropped in one step.
    pub fn load(&mut self, cues: Vec<Cue>) {
        tracing::debug!(count = cues.len(), "Loading cue index");
        self.cues = cues;
    }

    pub fn clear(&mut self) {
        self.cues.clear();
    }

    pub fn policy(&self) -> CueMatchPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: CueMatchPolicy) {
        self.policy = policy;
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Find the cue active at `time` under the configured policy.
    pub fn active_cue_at(&self, time: f64) -> Option<&Cue> {
        let mut active = self.cues.iter().filter(|cue| cue.is_active(time));
        match self.policy {
            CueMatchPolicy::FirstMatch => active.next(),
            CueMatchPolicy::LastMatch => active.last(),
            CueMatchPolicy::LongestMatch => active.fold(None, |best: Option<&Cue>, cue| match best {
                Some(b) if b.duration() >= cue.duration() => Some(b),
                _ => Some(cue),
            }),
        }
    }

    /// Text of the active cue, or the empty string
    pub fn text_at(&self, time: f64) -> &str {
        self.active_cue_at(time).map(|c| c.text.as_str()).unwrap_or("")
    }
}
