use thiserror::Error;

use crate::upload::{TaskState, UploadKind};

/// Main error type for the sync client.
///
/// The `Display` text of every variant is the message shown to the user.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Cannot reach the server while uploading the {kind} file. Check your network connection ({message})")]
    Transport { kind: UploadKind, message: String },

    #[error("{}", http_message(.kind, .status, .detail))]
    Http {
        kind: UploadKind,
        status: u16,
        detail: Option<String>,
    },

    #[error("Unexpected response from the server for the {kind} upload: {message}")]
    Decode { kind: UploadKind, message: String },

    #[error("The subtitle file contains no valid cues")]
    EmptyResult,

    #[error("{0}")]
    Media(#[from] MediaError),

    #[error("Invalid WebVTT content: {0}")]
    Vtt(String),

    #[error("An upload is already in progress")]
    Busy,

    #[error("Playback rate must be a positive number")]
    InvalidRate,

    #[error("Upload task cannot move from {from:?} to {to:?}")]
    TaskState { from: TaskState, to: TaskState },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// The upload stage this error belongs to, if any.
    pub fn stage(&self) -> Option<UploadKind> {
        match self {
            SyncError::Transport { kind, .. }
            | SyncError::Http { kind, .. }
            | SyncError::Decode { kind, .. } => Some(*kind),
            SyncError::Validation(v) => v.kind(),
            SyncError::EmptyResult => Some(UploadKind::Subtitle),
            _ => None,
        }
    }

    /// True if the error was raised before any network call was made.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            SyncError::Validation(_) | SyncError::Busy | SyncError::InvalidRate
        )
    }
}

/// Server supplied `detail` wins; otherwise the status code picks the message.
fn http_message(kind: &UploadKind, status: &u16, detail: &Option<String>) -> String {
    if let Some(detail) = detail {
        return detail.clone();
    }
    match *status {
        413 => format!("The {} file is too large for the server", kind),
        400 => format!("The server rejected the {} file as malformed", kind),
        500 => "The server hit an error. Please try again in a moment".to_string(),
        _ => format!("Failed to upload the {} file ({})", kind, status),
    }
}

/// Local pre-flight check failures. These never reach the network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Please select both an audio file and a subtitle file")]
    MissingFiles,

    #[error("Only WAV audio files can be uploaded (got {0:?})")]
    AudioFormat(String),

    #[error("Only VTT subtitle files can be uploaded (got {0:?})")]
    SubtitleFormat(String),

    #[error("Supported image formats: JPG, PNG, GIF, WebP (got {0:?})")]
    ImageFormat(String),

    #[error("The {kind} file has an unexpected content type: {mime}")]
    MimeType { kind: UploadKind, mime: String },

    #[error("The {kind} file is too large ({size} bytes, maximum {limit} bytes)")]
    TooLarge {
        kind: UploadKind,
        size: u64,
        limit: u64,
    },

    #[error("The {0} file is empty")]
    Empty(UploadKind),
}

impl ValidationError {
    pub fn kind(&self) -> Option<UploadKind> {
        match self {
            ValidationError::MissingFiles => None,
            ValidationError::AudioFormat(_) => Some(UploadKind::Audio),
            ValidationError::SubtitleFormat(_) => Some(UploadKind::Subtitle),
            ValidationError::ImageFormat(_) => Some(UploadKind::Image),
            ValidationError::MimeType { kind, .. }
            | ValidationError::TooLarge { kind, .. }
            | ValidationError::Empty(kind) => Some(*kind),
        }
    }
}

/// Media element error codes, numbered like the HTML media error codes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaError {
    #[error("Audio loading was aborted")]
    Aborted,

    #[error("A network error prevented the audio from loading")]
    Network,

    #[error("The audio file is corrupted or could not be decoded")]
    Decode,

    #[error("The audio format is not supported")]
    SrcNotSupported,
}

impl MediaError {
    /// Map a numeric media error code. Unknown codes are treated as decode failures.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => MediaError::Aborted,
            2 => MediaError::Network,
            4 => MediaError::SrcNotSupported,
            _ => MediaError::Decode,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            MediaError::Aborted => 1,
            MediaError::Network => 2,
            MediaError::Decode => 3,
            MediaError::SrcNotSupported => 4,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_detail_wins() {
        let err = SyncError::Http {
            kind: UploadKind::Audio,
            status: 413,
            detail: Some("file too big".to_string()),
        };
        assert_eq!(err.to_string(), "file too big");
    }

    #[test]
    fn test_http_status_messages() {
        let msg = |status| {
            SyncError::Http {
                kind: UploadKind::Subtitle,
                status,
                detail: None,
            }
            .to_string()
        };
        assert!(msg(413).contains("too large"));
        assert!(msg(400).contains("malformed"));
        assert!(msg(500).contains("try again"));
        assert!(msg(418).contains("(418)"));
    }

    #[test]
    fn test_stage_and_locality() {
        let err = SyncError::from(ValidationError::Empty(UploadKind::Subtitle));
        assert_eq!(err.stage(), Some(UploadKind::Subtitle));
        assert!(err.is_local());
        assert!(!SyncError::EmptyResult.is_local());
        assert_eq!(SyncError::EmptyResult.stage(), Some(UploadKind::Subtitle));
    }

    #[test]
    fn test_media_error_codes() {
        for code in 1..=4 {
            assert_eq!(MediaError::from_code(code).code(), code);
        }
        assert_eq!(MediaError::from_code(99), MediaError::Decode);
    }
}
