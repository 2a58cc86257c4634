//! Upload progress tracking
//!
//! Throughput and ETA are point estimates taken from the bytes sent so far
//! and the wall-clock time since the transfer started. Nothing is smoothed,
//! so bursty networks produce jumpy numbers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use super::UploadKind;

/// Channel end that receives progress events
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Throughput and ETA derived from one progress sample.
///
/// Both are `None` when no time has elapsed or no byte has been sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferMetrics {
    /// Bytes per second
    pub throughput_bps: Option<f64>,
    /// Estimated time until the last byte is sent
    pub eta: Option<Duration>,
}

impl TransferMetrics {
    pub const UNKNOWN: TransferMetrics = TransferMetrics {
        throughput_bps: None,
        eta: None,
    };

    pub fn compute(bytes_sent: u64, total_bytes: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        if bytes_sent == 0 || secs <= 0.0 {
            return Self::UNKNOWN;
        }

        let throughput = bytes_sent as f64 / secs;
        if !throughput.is_finite() || throughput <= 0.0 {
            return Self::UNKNOWN;
        }

        let remaining = total_bytes.saturating_sub(bytes_sent) as f64;
        let eta = Duration::try_from_secs_f64(remaining / throughput).ok();

        Self {
            throughput_bps: Some(throughput),
            eta,
        }
    }

    pub fn is_known(&self) -> bool {
        self.throughput_bps.is_some()
    }
}

impl fmt::Display for TransferMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.throughput_bps {
            Some(bps) => write!(f, "{}/s", format_bytes(bps))?,
            None => f.write_str("unknown speed")?,
        }
        match self.eta {
            Some(eta) => write!(f, ", {} left", format_duration(eta)),
            None => f.write_str(", time left unknown"),
        }
    }
}

/// Human readable byte count using binary units
pub fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{:.0} {}", value, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// `1h 02m 03s`, `2m 05s` or `7s`
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs_f64().ceil() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// One progress sample of an in-flight upload
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub task_id: Uuid,
    pub kind: UploadKind,
    pub bytes_sent: u64,
    pub total_bytes: u64,
    pub metrics: TransferMetrics,
}

impl ProgressEvent {
    /// Completed fraction in [0, 1]. An empty file counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            1.0
        } else {
            self.bytes_sent as f64 / self.total_bytes as f64
        }
    }

    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).floor().clamp(0.0, 100.0) as u8
    }
}

/// Counts bytes handed to the transport and publishes progress events.
///
/// Clones share the same counter, so the request body stream and the
/// session observe the same total.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    task_id: Uuid,
    kind: UploadKind,
    total_bytes: u64,
    started_at: Instant,
    sent: Arc<AtomicU64>,
    tx: Option<ProgressSender>,
}

impl ProgressReporter {
    pub fn new(task_id: Uuid, kind: UploadKind, total_bytes: u64, tx: Option<ProgressSender>) -> Self {
        Self {
            task_id,
            kind,
            total_bytes,
            started_at: Instant::now(),
            sent: Arc::new(AtomicU64::new(0)),
            tx,
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.sent.load(Ordering::Acquire)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Record `n` more bytes and publish the resulting event.
    /// The count never exceeds the declared total.
    pub fn advance(&self, n: u64) -> ProgressEvent {
        let total = self.total_bytes;
        let previous = self
            .sent
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |sent| {
                Some(sent.saturating_add(n).min(total))
            })
            .unwrap_or(total);
        let sent = previous.saturating_add(n).min(total);

        let event = self.event_for(sent);
        if let Some(tx) = &self.tx {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(event.clone());
        }
        tracing::trace!(
            task_id = %self.task_id,
            kind = %self.kind,
            bytes_sent = sent,
            total_bytes = total,
            "Upload progress"
        );
        event
    }

    /// Current state without recording anything
    pub fn snapshot(&self) -> ProgressEvent {
        self.event_for(self.bytes_sent())
    }

    fn event_for(&self, sent: u64) -> ProgressEvent {
        ProgressEvent {
            task_id: self.task_id,
            kind: self.kind,
            bytes_sent: sent,
            total_bytes: self.total_bytes,
            metrics: TransferMetrics::compute(sent, self.total_bytes, self.elapsed()),
        }
    }
}
