//! Test fixtures for integration tests
//!
//! A small axum server that speaks the sync server's upload API. It parses
//! uploaded subtitles with the crate's own WebVTT reader, records every
//! request in arrival order, and can be scripted to fail a given stage.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::cue::{parse_vtt, Cue};
use crate::upload::{UploadFile, UploadKind};

/// Scripted answer for one upload kind
#[derive(Debug, Clone)]
pub enum Reply {
    /// Status with a JSON `{detail}` body
    Detail(u16, &'static str),
    /// Status with a plain-text body
    Raw(u16, &'static str),
}

/// One upload as the server saw it
#[derive(Debug, Clone, PartialEq)]
pub struct Received {
    pub kind: UploadKind,
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: usize,
}

#[derive(Default)]
pub struct MockState {
    received: Mutex<Vec<Received>>,
    replies: Mutex<HashMap<UploadKind, Reply>>,
    subtitles: Mutex<HashMap<String, Vec<Cue>>>,
    throttle: Mutex<Option<Duration>>,
}

/// Bytes the server reads between two throttle pauses
const THROTTLE_BLOCK: usize = 64 * 1024;

/// Running mock server; shut down on drop
pub struct MockServer {
    pub base_url: String,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/api/upload/audio", post(upload_audio))
            .route("/api/upload/subtitle", post(upload_subtitle))
            .route("/api/upload/image", post(upload_image))
            .route("/api/files/subtitle/{filename}", get(get_subtitle))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    /// Make every upload of `kind` answer with `reply`
    pub fn script(&self, kind: UploadKind, reply: Reply) {
        self.state.replies.lock().unwrap().insert(kind, reply);
    }

    /// Sleep `delay` for every 64 KiB of upload body read
    pub fn throttle(&self, delay: Duration) {
        *self.state.throttle.lock().unwrap() = Some(delay);
    }

    pub fn received(&self) -> Vec<Received> {
        self.state.received.lock().unwrap().clone()
    }

    pub fn received_kinds(&self) -> Vec<UploadKind> {
        self.received().into_iter().map(|r| r.kind).collect()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// URL nothing listens on
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub const SAMPLE_VTT: &str = "WEBVTT\n\n00:00:00.000 --> 00:00:02.000\na\n\n00:00:02.000 --> 00:00:05.000\nb\n";

pub fn sample_wav(size: usize) -> UploadFile {
    let mut data = b"RIFF\0\0\0\0WAVE".to_vec();
    data.resize(size.max(data.len()), 0);
    UploadFile::from_bytes("song.wav", data).with_mime("audio/wav")
}

pub fn sample_vtt(content: &str) -> UploadFile {
    UploadFile::from_bytes("song.vtt", content.as_bytes().to_vec()).with_mime("text/vtt")
}

pub fn sample_png() -> UploadFile {
    UploadFile::from_bytes("cover.png", b"\x89PNG\r\n\x1a\n".to_vec()).with_mime("image/png")
}

async fn read_file_field(
    mut multipart: Multipart,
    throttle: Option<Duration>,
) -> Option<(String, Option<String>, Vec<u8>)> {
    while let Ok(Some(mut field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);

        let mut data = Vec::new();
        let mut since_pause = 0;
        while let Some(chunk) = field.chunk().await.ok()? {
            data.extend_from_slice(&chunk);
            since_pause += chunk.len();
            if let Some(delay) = throttle {
                while since_pause >= THROTTLE_BLOCK {
                    since_pause -= THROTTLE_BLOCK;
                    tokio::time::sleep(delay).await;
                }
            }
        }
        return Some((filename, content_type, data));
    }
    None
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

/// Record the upload and return either the scripted failure or the file
async fn accept(
    state: &MockState,
    kind: UploadKind,
    multipart: Multipart,
) -> Result<(String, Vec<u8>), Response> {
    let throttle = *state.throttle.lock().unwrap();
    let Some((filename, content_type, data)) = read_file_field(multipart, throttle).await else {
        return Err(detail(StatusCode::UNPROCESSABLE_ENTITY, "file field missing"));
    };
    state.received.lock().unwrap().push(Received {
        kind,
        filename: filename.clone(),
        content_type,
        bytes: data.len(),
    });

    let scripted = state.replies.lock().unwrap().get(&kind).cloned();
    match scripted {
        Some(Reply::Detail(code, message)) => Err(detail(status(code), message)),
        Some(Reply::Raw(code, body)) => Err((status(code), body).into_response()),
        None => Ok((filename, data)),
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn upload_audio(State(state): State<Arc<MockState>>, multipart: Multipart) -> Response {
    match accept(&state, UploadKind::Audio, multipart).await {
        Ok((filename, data)) => Json(json!({ "filename": filename, "size": data.len() })).into_response(),
        Err(response) => response,
    }
}

async fn upload_subtitle(State(state): State<Arc<MockState>>, multipart: Multipart) -> Response {
    let (filename, data) = match accept(&state, UploadKind::Subtitle, multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };
    match parse_vtt(&String::from_utf8_lossy(&data)) {
        Ok(cues) => {
            state
                .subtitles
                .lock()
                .unwrap()
                .insert(filename.clone(), cues.clone());
            Json(json!({ "filename": filename, "cues": cues })).into_response()
        }
        Err(e) => detail(StatusCode::BAD_REQUEST, &format!("Invalid VTT file: {}", e)),
    }
}

async fn upload_image(State(state): State<Arc<MockState>>, multipart: Multipart) -> Response {
    match accept(&state, UploadKind::Image, multipart).await {
        Ok((filename, _)) => Json(json!({
            "filename": filename,
            "url": format!("/api/files/image/{}", filename),
        }))
        .into_response(),
        Err(response) => response,
    }
}

async fn get_subtitle(State(state): State<Arc<MockState>>, Path(filename): Path<String>) -> Response {
    match state.subtitles.lock().unwrap().get(&filename) {
        Some(cues) => Json(json!({ "filename": filename, "cues": cues })).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Subtitle file not found"),
    }
}
