use super::state::AppState;
use crate::recording::RecorderError;
use crate::storage::Storage;
use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use tracing::{error, info, warn};

const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of `GET /`
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    #[serde(rename = "Device Name")]
    pub device_name: String,

    #[serde(rename = "Firmware Version")]
    pub firmware_version: String,

    #[serde(rename = "Serial Number")]
    pub serial_number: String,
}

#[derive(Debug, Deserialize)]
pub struct FileParams {
    pub file: Option<String>,
}

/// `old`/`new` as served by the device; `file`/`new_name` as sent by the
/// desktop client
#[derive(Debug, Deserialize)]
pub struct RenameParams {
    pub old: Option<String>,
    pub new: Option<String>,
    pub file: Option<String>,
    pub new_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimeParams {
    pub time: Option<String>,
}

fn recorder_failure(action: &str, e: RecorderError) -> Response {
    error!("Failed to {}: {}", action, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to {}: {}", action, e),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
pub async fn device_info<S: Storage>(State(state): State<AppState<S>>) -> impl IntoResponse {
    Json(DeviceInfo {
        device_name: state.device.name.clone(),
        firmware_version: state.device.firmware_version.clone(),
        serial_number: state.device.serial_number.clone(),
    })
}

/// GET /start
pub async fn start_recording<S: Storage>(State(state): State<AppState<S>>) -> Response {
    match state.recorder.start().await {
        Ok(()) => (StatusCode::OK, "Recording started").into_response(),
        Err(e) => recorder_failure("start recording", e),
    }
}

/// GET /stop
pub async fn stop_recording<S: Storage>(State(state): State<AppState<S>>) -> Response {
    match state.recorder.stop().await {
        Ok(summary) => {
            if let Some(summary) = summary {
                info!(
                    "Stopped {} after {} samples",
                    summary.file_name, summary.total_samples
                );
            }
            (StatusCode::OK, "Recording stopped").into_response()
        }
        Err(e) => recorder_failure("stop recording", e),
    }
}

/// GET /status
pub async fn recorder_status<S: Storage>(State(state): State<AppState<S>>) -> Response {
    match state.recorder.status().await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => recorder_failure("get status", e),
    }
}

/// GET /set_time?time=<unix seconds>
pub async fn set_time<S: Storage>(
    State(state): State<AppState<S>>,
    Query(params): Query<TimeParams>,
) -> Response {
    let Some(time) = params.time else {
        return (StatusCode::BAD_REQUEST, "Time parameter missing").into_response();
    };

    let Ok(epoch_secs) = time.trim().parse::<i64>() else {
        return (StatusCode::BAD_REQUEST, "Time parameter must be unix seconds").into_response();
    };

    match state.recorder.set_time(epoch_secs).await {
        Ok(()) => (StatusCode::OK, "Time set successfully").into_response(),
        Err(RecorderError::InvalidTime(reason)) => {
            (StatusCode::BAD_REQUEST, format!("Invalid time: {}", reason)).into_response()
        }
        Err(e) => recorder_failure("set time", e),
    }
}

/// GET /list
///
/// One `<name> - <size> MB` line per stored file.
pub async fn list_files<S: Storage>(State(state): State<AppState<S>>) -> Response {
    match state.storage.list() {
        Ok(files) => {
            let body: String = files
                .iter()
                .map(|f| format!("{} - {:.2} MB\n", f.name, f.size_mb()))
                .collect();
            (StatusCode::OK, body).into_response()
        }
        Err(e) => {
            error!("Failed to list files: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to list files").into_response()
        }
    }
}

/// GET /download?file=<name>
pub async fn download_file<S: Storage>(
    State(state): State<AppState<S>>,
    Query(params): Query<FileParams>,
) -> Response {
    let Some(file_name) = params.file else {
        return (StatusCode::BAD_REQUEST, "File parameter missing").into_response();
    };

    let opened = state
        .storage
        .file_size(&file_name)
        .and_then(|size| Ok((size, state.storage.open_read(&file_name)?)));

    let (size, reader) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            warn!("Download of {} failed: {}", file_name, e);
            return (StatusCode::NOT_FOUND, "File not found").into_response();
        }
    };

    info!("Serving {} ({} bytes)", file_name, size);

    (
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", file_name.trim_start_matches('/')),
            ),
        ],
        // A recording still in progress keeps growing; serve what was listed
        Body::from_stream(reader_stream(reader.take(size))),
    )
        .into_response()
}

/// GET /delete?file=<name>
pub async fn delete_file<S: Storage>(
    State(state): State<AppState<S>>,
    Query(params): Query<FileParams>,
) -> Response {
    let Some(file_name) = params.file else {
        return (StatusCode::BAD_REQUEST, "File parameter missing").into_response();
    };

    if state.storage.remove(&file_name) {
        (StatusCode::OK, "File deleted successfully").into_response()
    } else {
        (StatusCode::NOT_FOUND, "Failed to delete file").into_response()
    }
}

/// GET /rename?old=<name>&new=<name>
pub async fn rename_file<S: Storage>(
    State(state): State<AppState<S>>,
    Query(params): Query<RenameParams>,
) -> Response {
    let (Some(old), Some(new)) = (params.old.or(params.file), params.new.or(params.new_name)) else {
        return (StatusCode::BAD_REQUEST, "File parameters missing").into_response();
    };

    if state.storage.rename(&old, &new) {
        (StatusCode::OK, "File renamed successfully").into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "File rename failed").into_response()
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Stream a blocking reader in fixed-size chunks without stalling the runtime
fn reader_stream<R: Read + Send + 'static>(reader: R) -> impl Stream<Item = io::Result<Bytes>> {
    stream::try_unfold(reader, |reader| async move {
        let (reader, chunk) = tokio::task::spawn_blocking(move || -> io::Result<(R, Vec<u8>)> {
            let mut reader = reader;
            let mut chunk = vec![0u8; DOWNLOAD_CHUNK_SIZE];
            let n = reader.read(&mut chunk)?;
            chunk.truncate(n);
            Ok((reader, chunk))
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;

        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some((Bytes::from(chunk), reader)))
        }
    })
}
