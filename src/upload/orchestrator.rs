//! Sequential upload of one submission
//!
//! A submission is an audio file, a subtitle file and an optional cover
//! image. Stages run strictly one after another and stop at the first
//! failure. Files already stored by earlier stages stay on the server.

use std::sync::atomic::{AtomicBool, Ordering};

use super::progress::ProgressSender;
use super::session::{Transport, UploadSession};
use super::validate::validate_submission;
use super::{UploadFile, UploadKind, UploadPayload, UploadResult, UploadTask};
use crate::config::ClientConfig;
use crate::cue::Cue;
use crate::error::{Result, SyncError, ValidationError};

/// Everything a successful submission produced
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub audio: UploadResult,
    pub subtitle: UploadResult,
    pub image: Option<UploadResult>,
}

impl UploadOutcome {
    /// Cues returned by the subtitle stage; never empty
    pub fn cues(&self) -> &[Cue] {
        self.subtitle.cues().unwrap_or(&[])
    }

    pub fn audio_url(&self) -> Option<&str> {
        self.audio.url.as_deref()
    }

    pub fn image_url(&self) -> Option<&str> {
        match &self.image.as_ref()?.payload {
            UploadPayload::ImageUrl(url) => Some(url),
            _ => None,
        }
    }
}

/// Holds the busy flag for the duration of one submission
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs submissions through validation and the upload stages.
///
/// Only one submission may be in flight at a time; a second call made
/// while one is running fails with [`SyncError::Busy`].
pub struct UploadOrchestrator<T> {
    transport: T,
    config: ClientConfig,
    busy: AtomicBool,
}

impl<T: Transport> UploadOrchestrator<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            busy: AtomicBool::new(false),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Validate and upload one submission.
    ///
    /// Order is audio, subtitle, then image if one was given. The subtitle
    /// stage must yield at least one cue before the image stage starts.
    pub async fn submit(
        &self,
        audio: Option<UploadFile>,
        subtitle: Option<UploadFile>,
        image: Option<UploadFile>,
        progress: Option<ProgressSender>,
    ) -> Result<UploadOutcome> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            tracing::debug!("Submission rejected, another one is in flight");
            return Err(SyncError::Busy);
        };

        validate_submission(
            audio.as_ref(),
            subtitle.as_ref(),
            image.as_ref(),
            self.config.upload.max_file_size,
        )
        .inspect_err(|e| tracing::info!(error = %e, "Submission rejected by validation"))?;

        // Presence was checked by validation
        let (Some(audio), Some(subtitle)) = (audio, subtitle) else {
            return Err(ValidationError::MissingFiles.into());
        };

        let mut completed: Vec<UploadKind> = Vec::new();

        let audio = self
            .stage(UploadKind::Audio, audio, &progress, &completed)
            .await?;
        completed.push(UploadKind::Audio);

        let subtitle = self
            .stage(UploadKind::Subtitle, subtitle, &progress, &completed)
            .await?;
        completed.push(UploadKind::Subtitle);

        if subtitle.cues().map_or(true, |cues| cues.is_empty()) {
            tracing::warn!(
                filename = %subtitle.filename,
                stored = ?completed,
                "Subtitle produced no cues; stored files are kept"
            );
            return Err(SyncError::EmptyResult);
        }

        let image = match image {
            Some(image) => Some(
                self.stage(UploadKind::Image, image, &progress, &completed)
                    .await?,
            ),
            None => None,
        };

        let outcome = UploadOutcome {
            audio,
            subtitle,
            image,
        };
        tracing::info!(
            audio = %outcome.audio.filename,
            subtitle = %outcome.subtitle.filename,
            cues = outcome.cues().len(),
            image = outcome.image.is_some(),
            "Submission complete"
        );
        Ok(outcome)
    }

    async fn stage(
        &self,
        kind: UploadKind,
        file: UploadFile,
        progress: &Option<ProgressSender>,
        completed: &[UploadKind],
    ) -> Result<UploadResult> {
        let endpoint = self.config.url(kind.upload_path());
        let mut session = UploadSession::new(UploadTask::new(kind, file, endpoint), progress.clone());

        session.start(&self.transport).await.inspect_err(|e| {
            if !completed.is_empty() {
                tracing::warn!(
                    failed = %kind,
                    stored = ?completed,
                    error = %e,
                    "Submission aborted; earlier uploads are not rolled back"
                );
            }
        })
    }
}
