//! Upload pipeline
//!
//! This module drives file transfers to the sync server:
//! - Upload tasks and their lifecycle (pending, in flight, terminal)
//! - Byte-level progress with throughput and ETA estimates
//! - Local pre-flight validation
//! - Multipart HTTP transport with layered error classification
//! - Sequential orchestration of the audio, subtitle and image stages

pub mod http;
pub mod orchestrator;
pub mod progress;
pub mod session;
pub mod validate;

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::cue::Cue;
use crate::error::{Result, SyncError};

pub use http::HttpTransport;
pub use orchestrator::{UploadOrchestrator, UploadOutcome};
pub use progress::{ProgressEvent, ProgressReporter, ProgressSender, TransferMetrics};
pub use session::{Transport, UploadSession};

/// The three kinds of file the server accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Audio,
    Subtitle,
    Image,
}

impl UploadKind {
    /// Path of the upload endpoint for this kind
    pub fn upload_path(&self) -> &'static str {
        match self {
            UploadKind::Audio => "/api/upload/audio",
            UploadKind::Subtitle => "/api/upload/subtitle",
            UploadKind::Image => "/api/upload/image",
        }
    }

    /// Path segment used by the file serving endpoints
    pub fn files_segment(&self) -> &'static str {
        match self {
            UploadKind::Audio => "audio",
            UploadKind::Subtitle => "subtitle",
            UploadKind::Image => "image",
        }
    }

    /// Accepted lowercase filename extensions, without the dot
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Audio => &["wav"],
            UploadKind::Subtitle => &["vtt"],
            UploadKind::Image => &["jpg", "jpeg", "png", "gif", "webp"],
        }
    }

    /// Accepted declared MIME types
    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Audio => &["audio/wav", "audio/x-wav", "audio/wave"],
            UploadKind::Subtitle => &["text/vtt", "text/plain"],
            UploadKind::Image => &["image/jpeg", "image/png", "image/gif", "image/webp"],
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.files_segment())
    }
}

/// Guess a MIME type from a lowercase extension
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "wav" => Some("audio/wav"),
        "vtt" => Some("text/vtt"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[derive(Debug, Clone)]
enum FileSource {
    Memory(Bytes),
    Disk(PathBuf),
}

/// A file selected for upload: name, size, declared MIME type and contents.
#[derive(Debug, Clone)]
pub struct UploadFile {
    name: String,
    size: u64,
    mime: Option<String>,
    source: FileSource,
}

impl UploadFile {
    /// In-memory file. No MIME type is declared.
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            mime: None,
            source: FileSource::Memory(data),
        }
    }

    /// File on disk. The size comes from its metadata and the MIME type is
    /// guessed from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut file = Self {
            name,
            size: metadata.len(),
            mime: None,
            source: FileSource::Disk(path.to_path_buf()),
        };
        file.mime = file
            .extension()
            .and_then(|ext| mime_for_extension(&ext))
            .map(str::to_string);
        Ok(file)
    }

    /// Declare a MIME type for the file
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    /// Lowercase text after the last dot, so `.wav` alone counts as a WAV file
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// Open the contents as a stream of chunks of at most `chunk_size` bytes
    pub(crate) async fn open_stream(
        &self,
        chunk_size: usize,
    ) -> Result<BoxStream<'static, std::io::Result<Bytes>>> {
        let chunk_size = chunk_size.max(1);
        match &self.source {
            FileSource::Memory(data) => {
                let data = data.clone();
                let len = data.len();
                let chunks = (0..len)
                    .step_by(chunk_size)
                    .map(move |offset| {
                        Ok::<_, std::io::Error>(data.slice(offset..(offset + chunk_size).min(len)))
                    });
                Ok(stream::iter(chunks).boxed())
            }
            FileSource::Disk(path) => {
                let file = tokio::fs::File::open(path).await?;
                Ok(ReaderStream::with_capacity(file, chunk_size).boxed())
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn with_declared_size(name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            size,
            mime: None,
            source: FileSource::Memory(Bytes::new()),
        }
    }
}

/// Lifecycle of an upload task. `Succeeded` and `Failed` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    InFlight,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

/// One file transfer attempt
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub id: Uuid,
    pub kind: UploadKind,
    pub file: UploadFile,
    pub endpoint: String,
    state: TaskState,
}

impl UploadTask {
    pub fn new(kind: UploadKind, file: UploadFile, endpoint: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            file,
            endpoint: endpoint.into(),
            state: TaskState::Pending,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Move to `next`. Terminal states never change again.
    pub(crate) fn transition(&mut self, next: TaskState) -> Result<()> {
        let allowed = matches!(
            (self.state, next),
            (TaskState::Pending, TaskState::InFlight)
                | (TaskState::InFlight, TaskState::Succeeded)
                | (TaskState::InFlight, TaskState::Failed)
        );
        if !allowed {
            return Err(SyncError::TaskState {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Kind-specific payload decoded from a successful upload response
#[derive(Debug, Clone, PartialEq)]
pub enum UploadPayload {
    /// Audio uploads carry nothing beyond the filename
    None,
    /// Parsed subtitle cues in server order
    Cues(Vec<Cue>),
    /// Absolute URL the image can be displayed from
    ImageUrl(String),
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    /// Filename assigned by the server
    pub filename: String,
    /// URL the uploaded file is served from, if the server exposes one
    pub url: Option<String>,
    pub payload: UploadPayload,
}

impl UploadResult {
    pub fn cues(&self) -> Option<&[Cue]> {
        match &self.payload {
            UploadPayload::Cues(cues) => Some(cues),
            _ => None,
        }
    }
}
