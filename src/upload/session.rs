//! Single-file upload session

use std::future::Future;

use super::progress::{ProgressEvent, ProgressReporter, ProgressSender, TransferMetrics};
use super::{TaskState, UploadResult, UploadTask};
use crate::error::Result;

/// Moves one file to the server.
///
/// Implementations must feed every chunk they hand to the network through
/// `progress` and must classify failures as transport, HTTP or decode errors.
pub trait Transport: Sync {
    fn send(
        &self,
        task: &UploadTask,
        progress: ProgressReporter,
    ) -> impl Future<Output = Result<UploadResult>> + Send;
}

/// Drives one [`UploadTask`] through its lifecycle and tracks its progress.
#[derive(Debug)]
pub struct UploadSession {
    task: UploadTask,
    tx: Option<ProgressSender>,
    reporter: Option<ProgressReporter>,
}

impl UploadSession {
    pub fn new(task: UploadTask, tx: Option<ProgressSender>) -> Self {
        Self {
            task,
            tx,
            reporter: None,
        }
    }

    pub fn task(&self) -> &UploadTask {
        &self.task
    }

    pub fn bytes_sent(&self) -> u64 {
        self.reporter.as_ref().map(|r| r.bytes_sent()).unwrap_or(0)
    }

    pub fn total_bytes(&self) -> u64 {
        self.task.file.size()
    }

    /// Throughput and ETA right now; unknown before the session starts.
    pub fn metrics(&self) -> TransferMetrics {
        self.reporter
            .as_ref()
            .map(|r| r.snapshot().metrics)
            .unwrap_or(TransferMetrics::UNKNOWN)
    }

    pub fn snapshot(&self) -> Option<ProgressEvent> {
        self.reporter.as_ref().map(|r| r.snapshot())
    }

    /// Run the transfer to completion. A session runs at most once.
    pub async fn start<T: Transport>(&mut self, transport: &T) -> Result<UploadResult> {
        self.task.transition(TaskState::InFlight)?;

        let reporter = ProgressReporter::new(
            self.task.id,
            self.task.kind,
            self.task.file.size(),
            self.tx.clone(),
        );
        self.reporter = Some(reporter.clone());

        tracing::info!(
            task_id = %self.task.id,
            kind = %self.task.kind,
            file = %self.task.file.name(),
            size = self.task.file.size(),
            "Starting upload"
        );

        let result = transport.send(&self.task, reporter.clone()).await;

        match &result {
            Ok(upload) => {
                self.task.transition(TaskState::Succeeded)?;
                tracing::info!(
                    task_id = %self.task.id,
                    kind = %self.task.kind,
                    filename = %upload.filename,
                    elapsed_ms = reporter.elapsed().as_millis() as u64,
                    "Upload finished"
                );
            }
            Err(e) => {
                self.task.transition(TaskState::Failed)?;
                tracing::warn!(
                    task_id = %self.task.id,
                    kind = %self.task.kind,
                    bytes_sent = reporter.bytes_sent(),
                    error = %e,
                    "Upload failed"
                );
            }
        }
        result
    }
}
