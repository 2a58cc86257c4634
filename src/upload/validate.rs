//! Pre-flight validation
//!
//! All checks are local and run before any network call. They are applied
//! in a fixed order and the first failure is reported.

use super::{UploadFile, UploadKind};
use crate::error::ValidationError;

/// Check the extension and, if one is declared, the MIME type of `file`.
fn check_format(kind: UploadKind, file: &UploadFile) -> Result<(), ValidationError> {
    let ext = file.extension().unwrap_or_default();
    if !kind.allowed_extensions().contains(&ext.as_str()) {
        let shown = if ext.is_empty() { file.name().to_string() } else { format!(".{}", ext) };
        return Err(match kind {
            UploadKind::Audio => ValidationError::AudioFormat(shown),
            UploadKind::Subtitle => ValidationError::SubtitleFormat(shown),
            UploadKind::Image => ValidationError::ImageFormat(shown),
        });
    }

    if let Some(mime) = file.mime() {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        if !kind.allowed_mime_types().contains(&essence.as_str()) {
            return Err(ValidationError::MimeType {
                kind,
                mime: mime.to_string(),
            });
        }
    }
    Ok(())
}

fn check_max_size(kind: UploadKind, file: &UploadFile, limit: u64) -> Result<(), ValidationError> {
    if file.size() > limit {
        return Err(ValidationError::TooLarge {
            kind,
            size: file.size(),
            limit,
        });
    }
    Ok(())
}

fn check_not_empty(kind: UploadKind, file: &UploadFile) -> Result<(), ValidationError> {
    if file.size() == 0 {
        return Err(ValidationError::Empty(kind));
    }
    Ok(())
}

/// Validate one submission.
///
/// Order: presence of audio and subtitle, both formats, audio size limit,
/// non-empty subtitle, then every image check.
pub fn validate_submission(
    audio: Option<&UploadFile>,
    subtitle: Option<&UploadFile>,
    image: Option<&UploadFile>,
    max_file_size: u64,
) -> Result<(), ValidationError> {
    let (Some(audio), Some(subtitle)) = (audio, subtitle) else {
        return Err(ValidationError::MissingFiles);
    };

    check_format(UploadKind::Audio, audio)?;
    check_format(UploadKind::Subtitle, subtitle)?;
    check_max_size(UploadKind::Audio, audio, max_file_size)?;
    check_not_empty(UploadKind::Subtitle, subtitle)?;

    if let Some(image) = image {
        check_format(UploadKind::Image, image)?;
        check_max_size(UploadKind::Image, image, max_file_size)?;
        check_not_empty(UploadKind::Image, image)?;
    }
    Ok(())
}
