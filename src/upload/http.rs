//! Multipart HTTP transport
//!
//! Talks to the sync server's upload API. Each file is posted as the
//! multipart field `file`; the body is streamed chunk by chunk so progress
//! can be reported while the request is in flight.
//!
//! Failures are classified in three layers:
//! - transport: the request never got a response (connect, DNS, reset, timeout)
//! - HTTP: the server answered with a non-success status
//! - decode: the success body is not the JSON shape expected for the kind
//!
//! There is no cap on the total request time. A large file on a slow link
//! may take hours; an upload only fails once the body stops moving for the
//! idle window, or the server does not answer within the response window
//! after the last byte.

use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

use super::progress::ProgressReporter;
use super::session::Transport;
use super::{UploadKind, UploadPayload, UploadResult, UploadTask};
use crate::config::ClientConfig;
use crate::cue::Cue;
use crate::error::{Result, SyncError, ValidationError};

#[derive(Debug, Deserialize)]
struct AudioResponse {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct WireCue {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct SubtitleResponse {
    filename: String,
    cues: Vec<WireCue>,
}

#[derive(Debug, Deserialize)]
struct CuesResponse {
    cues: Vec<WireCue>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    filename: String,
    url: String,
}

/// reqwest-backed [`Transport`] for the sync server
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    chunk_size: usize,
    idle_timeout: Duration,
    response_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.upload.connect_timeout_secs))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {}", e)))?;
        Self::with_client(client, config)
    }

    /// Use an existing client, e.g. one shared with the rest of the host
    pub fn with_client(client: Client, config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| SyncError::Config(format!("invalid base URL {:?}: {}", config.base_url, e)))?;
        Ok(Self {
            client,
            base_url,
            chunk_size: config.upload.chunk_size,
            idle_timeout: Duration::from_secs(config.upload.idle_timeout_secs),
            response_timeout: Duration::from_secs(config.upload.response_timeout_secs),
        })
    }

    /// Absolute endpoint for uploading `kind`
    pub fn upload_endpoint(&self, kind: UploadKind) -> Result<String> {
        self.resolve(kind.upload_path())
    }

    /// URL the server serves an uploaded file from: `/api/files/{kind}/{filename}`
    pub fn file_url(&self, kind: UploadKind, filename: &str) -> Result<String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::Config(format!("base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "files", kind.files_segment(), filename]);
        Ok(url.to_string())
    }

    /// Resolve a server-relative path such as `/api/files/image/a.png`
    fn resolve(&self, path: &str) -> Result<String> {
        self.base_url
            .join(path)
            .map(|u| u.to_string())
            .map_err(|e| SyncError::Config(format!("invalid URL path {:?}: {}", path, e)))
    }

    /// Fetch the parsed cues of an already uploaded subtitle file
    pub async fn fetch_cues(&self, filename: &str) -> Result<Vec<Cue>> {
        let kind = UploadKind::Subtitle;
        let url = self.file_url(kind, filename)?;
        tracing::debug!(%url, "Fetching subtitle cues");

        let response = self
            .client
            .get(&url)
            .timeout(self.response_timeout)
            .send()
            .await
            .map_err(|e| transport_error(kind, e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| transport_error(kind, e))?;
        if !status.is_success() {
            return Err(http_error(kind, status.as_u16(), &body));
        }

        let parsed: CuesResponse = decode(kind, &body)?;
        Ok(into_cues(parsed.cues))
    }

    /// Drive `request` while watching the body counter in `progress`.
    ///
    /// Fails when no body byte moved for `idle_timeout` while sending, or
    /// when no response arrived within `response_timeout` after the body
    /// was fully handed over.
    async fn watch_stall<T>(
        &self,
        kind: UploadKind,
        progress: &ProgressReporter,
        request: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::pin!(request);

        let period = (self.idle_timeout / 4).max(Duration::from_millis(10));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let total = progress.total_bytes();
        let mut last_sent = progress.bytes_sent();
        let mut last_change = Instant::now();

        loop {
            tokio::select! {
                result = &mut request => return result,
                _ = ticker.tick() => {
                    let sent = progress.bytes_sent();
                    if sent != last_sent {
                        last_sent = sent;
                        last_change = Instant::now();
                        continue;
                    }
                    let quiet = last_change.elapsed();
                    if sent < total && quiet >= self.idle_timeout {
                        tracing::warn!(kind = %kind, bytes_sent = sent, total_bytes = total, "Upload stalled");
                        return Err(SyncError::Transport {
                            kind,
                            message: format!(
                                "upload stalled, no progress for {}s",
                                self.idle_timeout.as_secs()
                            ),
                        });
                    }
                    if sent >= total && quiet >= self.response_timeout {
                        return Err(SyncError::Transport {
                            kind,
                            message: format!(
                                "no response within {}s after the upload finished",
                                self.response_timeout.as_secs()
                            ),
                        });
                    }
                }
            }
        }
    }

    fn decode_success(&self, kind: UploadKind, body: &[u8]) -> Result<UploadResult> {
        match kind {
            UploadKind::Audio => {
                let parsed: AudioResponse = decode(kind, body)?;
                let url = self.file_url(kind, &parsed.filename)?;
                Ok(UploadResult {
                    filename: parsed.filename,
                    url: Some(url),
                    payload: UploadPayload::None,
                })
            }
            UploadKind::Subtitle => {
                let parsed: SubtitleResponse = decode(kind, body)?;
                Ok(UploadResult {
                    filename: parsed.filename,
                    url: None,
                    payload: UploadPayload::Cues(into_cues(parsed.cues)),
                })
            }
            UploadKind::Image => {
                let parsed: ImageResponse = decode(kind, body)?;
                let url = self.resolve(&parsed.url)?;
                Ok(UploadResult {
                    filename: parsed.filename,
                    url: Some(url.clone()),
                    payload: UploadPayload::ImageUrl(url),
                })
            }
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, task: &UploadTask, progress: ProgressReporter) -> Result<UploadResult> {
        let kind = task.kind;
        let file = &task.file;

        let stream = file.open_stream(self.chunk_size).await?;
        let counter = progress.clone();
        let counted = stream.inspect(move |chunk| {
            if let Ok(bytes) = chunk {
                counter.advance(bytes.len() as u64);
            }
        });

        let mut part = Part::stream_with_length(reqwest::Body::wrap_stream(counted), file.size())
            .file_name(file.name().to_string());
        if let Some(mime) = file.mime() {
            part = part.mime_str(mime).map_err(|_| {
                SyncError::Validation(ValidationError::MimeType {
                    kind,
                    mime: mime.to_string(),
                })
            })?;
        }
        let form = Form::new().part("file", part);

        let request = async {
            let response = self
                .client
                .post(&task.endpoint)
                .multipart(form)
                .send()
                .await
                .map_err(|e| transport_error(kind, e))?;
            let status = response.status();
            let body = response.bytes().await.map_err(|e| transport_error(kind, e))?;
            Ok::<_, SyncError>((status, body))
        };
        let (status, body) = self.watch_stall(kind, &progress, request).await?;
        tracing::debug!(
            task_id = %task.id,
            kind = %kind,
            status = status.as_u16(),
            body_len = body.len(),
            "Upload response received"
        );

        if !status.is_success() {
            return Err(http_error(kind, status.as_u16(), &body));
        }
        self.decode_success(kind, &body)
    }
}

fn transport_error(kind: UploadKind, e: reqwest::Error) -> SyncError {
    let message = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    };
    SyncError::Transport { kind, message }
}

/// Build the HTTP error for a failed response, taking `detail` from a JSON body when there is one.
pub(crate) fn http_error(kind: UploadKind, status: u16, body: &[u8]) -> SyncError {
    let detail = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .filter(|d| !d.trim().is_empty());
    SyncError::Http {
        kind,
        status,
        detail,
    }
}

fn decode<'a, T: Deserialize<'a>>(kind: UploadKind, body: &'a [u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| SyncError::Decode {
        kind,
        message: e.to_string(),
    })
}

fn into_cues(wire: Vec<WireCue>) -> Vec<Cue> {
    let total = wire.len();
    let cues: Vec<Cue> = wire
        .into_iter()
        .filter_map(|c| Cue::new(c.start, c.end, c.text))
        .collect();
    if cues.len() != total {
        tracing::warn!(
            dropped = total - cues.len(),
            "Dropped cues with an empty or invalid time range"
        );
    }
    cues
}
