//! HTTP surface of the Mercury gateway.
//!
//! JSON endpoints for chat dispatch, recording control, transcription,
//! synthesis, and uploads, plus static serving of the web client. Every
//! failure is a JSON error response mapped from the error taxonomy —
//! handlers never panic the process.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::audio::{Recorder, recorder, tts};
use crate::backend::{ChatRequest, dispatch};
use crate::config::ServerConfig;
use crate::credentials::Credentials;
use crate::error::MercuryError;

/// Shared state for axum handlers.
///
/// Everything here is immutable per request except the recorder's
/// single-slot capture handle; backend configuration is resolved fresh
/// inside each dispatch call and never stored here.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Process-wide credential state.
    pub credentials: Arc<Credentials>,
    /// Shared HTTP client for backend calls.
    pub http: reqwest::Client,
    /// Single-slot capture process manager.
    pub recorder: Arc<Recorder>,
}

impl AppState {
    /// Build the application state from configuration and credentials.
    pub fn new(config: ServerConfig, credentials: Credentials) -> Self {
        let recorder = Arc::new(Recorder::new(config.audio.clone()));
        Self {
            config: Arc::new(config),
            credentials: Arc::new(credentials),
            http: reqwest::Client::new(),
            recorder,
        }
    }
}

impl IntoResponse for MercuryError {
    fn into_response(self) -> Response {
        let status = match &self {
            MercuryError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            MercuryError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(code = self.code(), error = %self, "request failed");
        (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();
    Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/api/start-recording", post(handle_start_recording))
        .route("/api/stop-recording", post(handle_stop_recording))
        .route("/api/transcribe", post(handle_transcribe))
        .route("/api/tts", post(handle_tts))
        .route("/api/upload/document", post(handle_upload_document))
        .route("/api/upload/image", post(handle_upload_image))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
}

/// Bind and serve until shutdown.
///
/// # Errors
///
/// Returns an error if the uploads directory cannot be created or the
/// listener cannot bind.
pub async fn run(config: ServerConfig, credentials: Credentials) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.uploads.dir).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, credentials);
    let app = router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!("mercury gateway listening on http://{local_addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

// ── Chat ──────────────────────────────────────────────────────

async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<crate::backend::ChatReply>, MercuryError> {
    tracing::info!(model = %request.model, "chat request received");
    let reply = dispatch(
        &request,
        &state.credentials,
        &state.config.chat,
        &state.http,
    )
    .await?;
    Ok(Json(reply))
}

// ── Recording ─────────────────────────────────────────────────

async fn handle_start_recording(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, MercuryError> {
    let started = state.recorder.start().await?;
    let message = if started.restarted {
        "Recording restarted"
    } else {
        "Recording started"
    };
    Ok(Json(serde_json::json!({
        "success": true,
        "message": message,
    })))
}

async fn handle_stop_recording(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, MercuryError> {
    let transcription = state.recorder.stop(&state.credentials).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "transcription": transcription,
    })))
}

// ── Transcription of uploaded audio ───────────────────────────

async fn handle_transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, MercuryError> {
    let mut audio: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MercuryError::Upload(format!("malformed multipart body: {e}")))?
    {
        if field.name() == Some("audio") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| MercuryError::Upload(format!("cannot read audio field: {e}")))?;
            audio = Some(bytes.to_vec());
        }
    }
    let audio = audio
        .ok_or_else(|| MercuryError::InvalidRequest("missing audio field".to_owned()))?;

    // Stage the upload next to the other temporary audio files, transcribe
    // it with the same tool as stop-recording, and always remove it.
    let staged = state
        .config
        .audio
        .temp_dir
        .join(format!("transcribe_{}.wav", Uuid::new_v4()));
    tokio::fs::write(&staged, &audio)
        .await
        .map_err(|e| MercuryError::Io(format!("cannot stage uploaded audio: {e}")))?;

    let result =
        recorder::transcribe_file(&state.config.audio.asr, &state.credentials, &staged).await;

    if let Err(e) = tokio::fs::remove_file(&staged).await {
        tracing::warn!(error = %e, "failed to delete staged audio upload");
    }

    let text = result?;
    Ok(Json(serde_json::json!({
        "success": true,
        "text": text,
    })))
}

// ── Text-to-speech ────────────────────────────────────────────

#[derive(Debug, serde::Deserialize)]
struct TtsRequest {
    text: String,
    #[serde(default)]
    voice: Option<String>,
}

async fn handle_tts(State(state): State<AppState>, Json(request): Json<TtsRequest>) -> Response {
    match tts::synthesize(
        &state.config.audio,
        &request.text,
        request.voice.as_deref(),
    )
    .await
    {
        Ok(bytes) => {
            let headers = [
                (header::CONTENT_TYPE, "audio/wav".to_owned()),
                (header::CONTENT_LENGTH, bytes.len().to_string()),
            ];
            (headers, bytes).into_response()
        }
        Err(e @ MercuryError::InvalidRequest(_)) => e.into_response(),
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "tts request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "Internal server error",
                    "details": e.message(),
                })),
            )
                .into_response()
        }
    }
}

// ── Uploads ───────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct StoredUpload {
    filename: String,
    #[serde(rename = "originalName")]
    original_name: String,
    size: u64,
    path: String,
}

async fn handle_upload_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, MercuryError> {
    let files = store_uploads(&state, multipart).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "files": files,
    })))
}

async fn handle_upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, MercuryError> {
    let images = store_uploads(&state, multipart).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "images": images,
    })))
}

/// Persist every file field of a multipart body under the uploads dir.
async fn store_uploads(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<Vec<StoredUpload>, MercuryError> {
    let dir = &state.config.uploads.dir;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| MercuryError::Io(format!("cannot create uploads dir: {e}")))?;

    let mut stored = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MercuryError::Upload(format!("malformed multipart body: {e}")))?
    {
        let Some(original_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| MercuryError::Upload(format!("cannot read uploaded file: {e}")))?;

        let filename = unique_upload_name(&original_name);
        let path = dir.join(&filename);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| MercuryError::Upload(format!("cannot store uploaded file: {e}")))?;

        tracing::info!(file = %path.display(), size = bytes.len(), "stored upload");
        stored.push(StoredUpload {
            filename,
            original_name,
            size: bytes.len() as u64,
            path: path.display().to_string(),
        });
    }

    if stored.is_empty() {
        return Err(MercuryError::InvalidRequest(
            "no files in upload request".to_owned(),
        ));
    }
    Ok(stored)
}

/// Collision-free stored name preserving the original extension.
fn unique_upload_name(original: &str) -> String {
    let extension = PathBuf::from(original)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("{}{extension}", Uuid::new_v4())
}
