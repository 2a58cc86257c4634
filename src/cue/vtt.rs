//! WebVTT reader
//!
//! Parses WebVTT text into [`Cue`]s. Only timing and text are kept; cue
//! settings after the timing line are ignored.

use regex::Regex;
use std::sync::OnceLock;

use super::Cue;
use crate::error::{Result, SyncError};

fn timing_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\S+)\s+-->\s+(\S+)(?:\s+.*)?$").expect("timing regex is valid")
    })
}

fn timestamp() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(\d+):)?([0-5]\d):([0-5]\d)\.(\d{3})$").expect("timestamp regex is valid")
    })
}

/// Convert a WebVTT timestamp (`HH:MM:SS.mmm` or `MM:SS.mmm`) to seconds.
pub fn timestamp_to_secs(ts: &str) -> Result<f64> {
    let caps = timestamp()
        .captures(ts)
        .ok_or_else(|| SyncError::Vtt(format!("invalid timestamp {:?}", ts)))?;

    let out_of_range = || SyncError::Vtt(format!("timestamp out of range {:?}", ts));
    let field = |i: usize| -> Result<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().map_err(|_| out_of_range()),
            None => Ok(0),
        }
    };
    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    let millis = field(4)?;

    let total_ms = hours
        .checked_mul(60)
        .and_then(|m| m.checked_add(minutes))
        .and_then(|m| m.checked_mul(60))
        .and_then(|s| s.checked_add(seconds))
        .and_then(|s| s.checked_mul(1000))
        .and_then(|ms| ms.checked_add(millis))
        .ok_or_else(out_of_range)?;
    Ok(total_ms as f64 / 1000.0)
}

/// Parse WebVTT content into cues in file order.
///
/// A valid file without cues gives an empty list. Cues whose end is not
/// after their start are skipped.
pub fn parse_vtt(content: &str) -> Result<Vec<Cue>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");

    let mut blocks = normalized.split("\n\n").map(|b| b.trim_matches('\n'));

    let header = blocks.next().unwrap_or("");
    if !header.starts_with("WEBVTT") {
        return Err(SyncError::Vtt("missing WEBVTT header".to_string()));
    }

    let mut cues = Vec::new();
    for block in blocks {
        if block.trim().is_empty() {
            continue;
        }
        if let Some(cue) = parse_block(block)? {
            cues.push(cue);
        }
    }

    tracing::debug!(count = cues.len(), "Parsed WebVTT content");
    Ok(cues)
}

fn parse_block(block: &str) -> Result<Option<Cue>> {
    let first = block.lines().next().unwrap_or("");
    if first.starts_with("NOTE") || first.starts_with("STYLE") || first.starts_with("REGION") {
        return Ok(None);
    }

    let mut lines = block.lines().peekable();
    // Optional cue identifier
    if let Some(line) = lines.peek() {
        if !line.contains("-->") {
            lines.next();
        }
    }

    let Some(timing) = lines.next() else {
        return Ok(None);
    };
    let caps = timing_line()
        .captures(timing)
        .ok_or_else(|| SyncError::Vtt(format!("invalid cue timing line {:?}", timing)))?;

    let start = timestamp_to_secs(&caps[1])?;
    let end = timestamp_to_secs(&caps[2])?;
    let text = lines.collect::<Vec<_>>().join("\n");

    let cue = Cue::new(start, end, text);
    if cue.is_none() {
        tracing::warn!(start, end, "Skipping WebVTT cue with empty interval");
    }
    Ok(cue)
}
