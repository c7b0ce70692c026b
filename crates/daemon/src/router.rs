//! HTTP router dispatching API requests to the file manager.
//!
//! This module builds the axum `Router` for the service. Each handler turns
//! one request into one file manager call, runs it on the blocking pool and
//! serializes the result with the protocol types. Failures are mapped onto
//! [`ApiError`], which renders as `{"error": "..."}` with a matching status.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use protocol::{
    CreateFolderRequest, CreateFolderResponse, DeleteResponse, ErrorResponse, FileEntry,
    FileListResponse, HealthResponse, RenameRequest, RenameResponse, UploadResponse,
};
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::files::{BrowserError, DirectoryBrowser, DirectoryEntry, FileTransfer, TransferError};

/// Multipart field carrying uploaded files.
pub const UPLOAD_FIELD: &str = "files";

const NOT_FOUND_MESSAGE: &str = "File not found";

/// RFC 5987 `attr-char`: everything else in a `filename*` value is escaped.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Errors returned to API clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The referenced entry does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A required field is missing or empty, or a name is taken.
    #[error("{0}")]
    InvalidInput(String),

    /// Unexpected filesystem failure. Carries only the generic client message;
    /// the cause is logged where it happens.
    #[error("{0}")]
    Internal(&'static str),

    /// The multipart body was malformed or exceeded the body limit.
    #[error(transparent)]
    Multipart(#[from] MultipartError),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Multipart(e) => e.status(),
        }
    }

    /// Map a browser error, logging IO failures under `failure`.
    fn from_browser(err: BrowserError, failure: &'static str) -> Self {
        match err {
            BrowserError::NotFound(_) => ApiError::NotFound(NOT_FOUND_MESSAGE.to_string()),
            BrowserError::InvalidName(_) | BrowserError::AlreadyExists(_) => {
                ApiError::InvalidInput(err.to_string())
            }
            BrowserError::Io(e) => {
                error!("{}: {}", failure, e);
                ApiError::Internal(failure)
            }
        }
    }

    /// Map a transfer error, logging IO failures under `failure`.
    fn from_transfer(err: TransferError, failure: &'static str) -> Self {
        match err {
            TransferError::Browser(e) => Self::from_browser(e, failure),
            TransferError::IsADirectory(_) => {
                ApiError::InvalidInput("Cannot download a folder".to_string())
            }
            TransferError::ExtensionNotAllowed(_) => ApiError::InvalidInput(err.to_string()),
            TransferError::Io(e) => {
                error!("{}: {}", failure, e);
                ApiError::Internal(failure)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Multipart(e) => e.body_text(),
            other => other.to_string(),
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Shared, immutable state handed to every handler.
pub struct AppState {
    config: Config,
    browser: Arc<DirectoryBrowser>,
    transfer: FileTransfer,
}

impl AppState {
    /// Open the storage root described by `config`, creating it if needed.
    pub fn new(config: Config) -> Result<Self, BrowserError> {
        let browser = Arc::new(DirectoryBrowser::open(&config.storage.root_dir)?);
        let transfer = FileTransfer::new(Arc::clone(&browser), &config.storage);
        Ok(Self {
            config,
            browser,
            transfer,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn browser(&self) -> &DirectoryBrowser {
        &self.browser
    }

    pub fn transfer(&self) -> &FileTransfer {
        &self.transfer
    }
}

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;
    let body_limit = usize::try_from(state.config.storage.max_upload_size).unwrap_or(usize::MAX);

    let api = Router::new()
        .route("/files", get(list_files))
        .route("/upload", post(upload_files))
        .route("/download/{id}", get(download_file))
        .route("/folders", post(create_folder))
        .route("/files/{id}", delete(delete_entry))
        .route("/files/{id}/rename", put(rename_entry))
        .route("/files/{id}/info", get(entry_info))
        .route("/health", get(health));

    let mut router = Router::new()
        .nest("/api", api)
        .route_service("/", ServeFile::new(server.frontend_dir.join("index.html")))
        .fallback_service(ServeDir::new(&server.frontend_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http());

    if server.cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}

/// Run a file manager call on the blocking pool.
async fn run_blocking<T, F>(
    state: &Arc<AppState>,
    failure: &'static str,
    f: F,
) -> Result<T, ApiError>
where
    F: FnOnce(&AppState) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    match tokio::task::spawn_blocking(move || f(&state)).await {
        Ok(result) => result,
        Err(e) => {
            error!("{}: blocking task failed: {}", failure, e);
            Err(ApiError::Internal(failure))
        }
    }
}

async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FileListResponse>, ApiError> {
    let files = run_blocking(&state, "Failed to fetch files", |state| {
        Ok(state
            .browser
            .list()
            .iter()
            .map(DirectoryEntry::to_protocol)
            .collect::<Vec<FileEntry>>())
    })
    .await?;

    Ok(Json(FileListResponse { files }))
}

async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut saw_files_part = false;
    let mut saw_file = false;
    let mut stored = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        saw_files_part = true;

        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        saw_file = true;

        let data = field.bytes().await?;
        let label = file_name.clone();

        let result = run_blocking(&state, "Upload failed", move |state| {
            state
                .transfer
                .store_upload(&file_name, &data)
                .map_err(|e| ApiError::from_transfer(e, "Upload failed"))
        })
        .await;

        match result {
            Ok(entry) => {
                info!("Uploaded {:?} as {}", label, entry.id);
                stored.push(entry.to_protocol());
            }
            Err(e) => warn!("Skipping upload of {:?}: {}", label, e),
        }
    }

    if !saw_files_part {
        return Err(ApiError::InvalidInput("No files part".to_string()));
    }
    if !saw_file {
        return Err(ApiError::InvalidInput("No files uploaded".to_string()));
    }

    Ok(Json(UploadResponse::new(stored)))
}

async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let download = run_blocking(&state, "Download failed", move |state| {
        state
            .transfer
            .open_download(&id)
            .map_err(|e| ApiError::from_transfer(e, "Download failed"))
    })
    .await?;

    let disposition = content_disposition(&download.name);
    let stream = ReaderStream::new(tokio::fs::File::from_std(download.file));

    Ok((
        [
            (
                CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (CONTENT_LENGTH, HeaderValue::from(download.size)),
            (CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

async fn create_folder(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateFolderRequest>, JsonRejection>,
) -> Result<Json<CreateFolderResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidInput(e.body_text()))?;

    let folder = run_blocking(&state, "Failed to create folder", move |state| {
        state
            .browser
            .create_folder(&request.name)
            .map_err(|e| ApiError::from_browser(e, "Failed to create folder"))
    })
    .await?;

    info!("Created folder {}", folder.id);
    Ok(Json(CreateFolderResponse {
        success: true,
        folder: folder.to_protocol(),
    }))
}

async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let target = id.clone();
    run_blocking(&state, "Failed to delete file", move |state| {
        state
            .browser
            .delete(&target)
            .map_err(|e| ApiError::from_browser(e, "Failed to delete file"))
    })
    .await?;

    info!("Deleted {}", id);
    Ok(Json(DeleteResponse {
        success: true,
        message: "File deleted successfully".to_string(),
    }))
}

async fn rename_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Json<RenameResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidInput(e.body_text()))?;

    let source = id.clone();
    let new_id = run_blocking(&state, "Failed to rename file", move |state| {
        state
            .browser
            .rename(&source, &request.name)
            .map_err(|e| ApiError::from_browser(e, "Failed to rename file"))
    })
    .await?;

    info!("Renamed {} to {}", id, new_id);
    Ok(Json(RenameResponse {
        success: true,
        message: "File renamed successfully".to_string(),
        new_id,
    }))
}

async fn entry_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FileEntry>, ApiError> {
    let entry = run_blocking(&state, "Failed to get file info", move |state| {
        state
            .browser
            .get_entry(&id)
            .map_err(|e| ApiError::from_browser(e, "Failed to get file info"))
    })
    .await?;

    Ok(Json(entry.to_protocol()))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Build an attachment `Content-Disposition` for `name`.
///
/// Names that are not plain printable ASCII get an ASCII fallback plus an
/// RFC 5987 `filename*` parameter.
fn content_disposition(name: &str) -> HeaderValue {
    let fallback: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut value = format!("attachment; filename=\"{}\"", fallback);
    if fallback != name {
        value.push_str("; filename*=UTF-8''");
        value.extend(utf8_percent_encode(name, ATTR_CHAR));
    }

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
