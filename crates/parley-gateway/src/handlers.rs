// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles POST /v1/chat, the /v1/files routes, the per-conversation file
//! routes and GET /health.

use axum::{
    body::Bytes,
    extract::{
        multipart::{Field, MultipartError},
        Multipart, Path, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use parley_core::types::{FileMetadata, NewFile};
use parley_core::{HealthStatus, RelayError};
use parley_storage::{ingest_batch, UploadFailure, UploadOutcome};

use crate::relay::AgentRelay;
use crate::server::{GatewayState, MAX_FILES_PER_REQUEST};
use crate::sse::{ChannelTransport, SseStreamAdapter, CHANNEL_CAPACITY};

/// MIME type used when an upload part does not declare one.
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub mock_mode: bool,
}

/// Response body for POST /v1/files.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: UploadOutcome,
}

/// Request body for POST /v1/conversations/{id}/files.
#[derive(Debug, Deserialize)]
pub struct AttachRequest {
    pub file_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AttachResponse {
    pub attached: usize,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Map an error to its HTTP status and JSON body.
pub fn error_response(err: &RelayError) -> Response {
    let status = match err {
        RelayError::NotFound { .. } => StatusCode::NOT_FOUND,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        RelayError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if err.is_integrity_error() {
        error!(error = %err, "stored file failed integrity check");
    } else if status.is_server_error() {
        error!(error = %err, "request failed");
    } else {
        debug!(error = %err, "request rejected");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// POST /v1/chat
///
/// Validates the request synchronously, then streams relay events as SSE.
/// Invalid requests get a 400 JSON body, never a stream.
pub async fn post_chat(State(state): State<GatewayState>, body: Bytes) -> Response {
    let parsed: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return error_response(&RelayError::Validation(format!("invalid JSON body: {e}")));
        }
    };
    let turn = match AgentRelay::prepare(&parsed) {
        Ok(turn) => turn,
        Err(e) => return error_response(&e),
    };

    let (transport, body) = ChannelTransport::channel(CHANNEL_CAPACITY);
    let relay = state.relay.clone();
    tokio::spawn(async move {
        let mut sink = SseStreamAdapter::new(transport);
        relay.run(turn, &mut sink).await;
    });

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            (header::CONNECTION, "keep-alive"),
        ],
        [("x-accel-buffering", "no")],
        body,
    )
        .into_response()
}

/// POST /v1/files
///
/// Multipart form: `session_id`, optional `conversation_id`, and one or more
/// `file` parts. Every file is stored independently.
pub async fn upload_files(State(state): State<GatewayState>, mut multipart: Multipart) -> Response {
    let mut session_id = None;
    let mut conversation_id = None;
    let mut parts: Vec<(String, String, Vec<u8>)> = Vec::new();
    let mut rejected: Vec<UploadFailure> = Vec::new();
    let mut file_count = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return error_response(&RelayError::Validation(format!(
                    "malformed multipart body: {e}"
                )));
            }
        };
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "session_id" | "conversation_id" => {
                let value = match field.text().await {
                    Ok(value) => value,
                    Err(e) => {
                        return error_response(&RelayError::Validation(format!(
                            "unreadable `{name}` field: {e}"
                        )));
                    }
                };
                let value = Some(value).filter(|v| !v.trim().is_empty());
                if name == "session_id" {
                    session_id = value;
                } else {
                    conversation_id = value;
                }
            }
            "file" | "files" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field.content_type().unwrap_or(DEFAULT_MIME_TYPE).to_string();
                if file_count == MAX_FILES_PER_REQUEST {
                    rejected.push(UploadFailure {
                        error: format!("more than {MAX_FILES_PER_REQUEST} files in one request"),
                        filename,
                    });
                    continue;
                }
                file_count += 1;
                match read_capped(field, state.max_upload_bytes).await {
                    Ok(Some(data)) => parts.push((filename, mime_type, data)),
                    Ok(None) => {
                        warn!(filename = %filename, "upload exceeds the size limit");
                        rejected.push(UploadFailure {
                            error: format!(
                                "{filename} is larger than the {} byte limit",
                                state.max_upload_bytes
                            ),
                            filename,
                        });
                    }
                    Err(e) => {
                        return error_response(&RelayError::Validation(format!(
                            "failed to read {filename}: {e}"
                        )));
                    }
                }
            }
            other => warn!(field = other, "ignoring unknown multipart field"),
        }
    }

    let Some(session_id) = session_id else {
        return error_response(&RelayError::Validation("`session_id` is required".into()));
    };

    let files = parts
        .into_iter()
        .map(|(filename, mime_type, data)| {
            (
                NewFile {
                    conversation_id: conversation_id.clone(),
                    session_id: session_id.clone(),
                    filename,
                    mime_type,
                },
                data,
            )
        })
        .collect();

    let mut outcome = ingest_batch(state.store.as_ref(), files).await;
    outcome.errors.extend(rejected);
    let success = outcome.success();
    let status = if success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(UploadResponse { success, outcome })).into_response()
}

/// Read a file part, giving up once it passes `max` bytes.
///
/// `Ok(None)` means the part was too large; its unread remainder is skipped
/// by the next `next_field` call.
async fn read_capped(mut field: Field<'_>, max: usize) -> Result<Option<Vec<u8>>, MultipartError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if data.len() + chunk.len() > max {
            return Ok(None);
        }
        data.extend_from_slice(&chunk);
    }
    Ok(Some(data))
}

/// GET /v1/files/{file_id}
///
/// Raw bytes with the stored MIME type.
pub async fn get_file(State(state): State<GatewayState>, Path(file_id): Path<String>) -> Response {
    let meta = match state.store.get_metadata(&file_id).await {
        Ok(Some(meta)) => meta,
        Ok(None) => return error_response(&RelayError::NotFound { file_id }),
        Err(e) => return error_response(&e),
    };
    let data = match state.store.get(&file_id).await {
        Ok(data) => data,
        Err(e) => return error_response(&e),
    };

    let content_type = HeaderValue::from_str(&meta.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_MIME_TYPE));
    let disposition = HeaderValue::from_str(&content_disposition(&meta.filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response()
}

/// GET /v1/files/{file_id}/metadata
pub async fn get_file_metadata(
    State(state): State<GatewayState>,
    Path(file_id): Path<String>,
) -> Response {
    match state.store.get_metadata(&file_id).await {
        Ok(Some(meta)) => Json(meta).into_response(),
        Ok(None) => error_response(&RelayError::NotFound { file_id }),
        Err(e) => error_response(&e),
    }
}

/// DELETE /v1/files/{file_id}
pub async fn delete_file(
    State(state): State<GatewayState>,
    Path(file_id): Path<String>,
) -> Response {
    match state.store.delete(&file_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(&RelayError::NotFound { file_id }),
        Err(e) => error_response(&e),
    }
}

/// GET /v1/conversations/{conversation_id}/files
pub async fn list_conversation_files(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
) -> Response {
    match state.store.list_by_conversation(&conversation_id).await {
        Ok(files) => Json::<Vec<FileMetadata>>(files).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /v1/conversations/{conversation_id}/files
pub async fn attach_files(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
    Json(body): Json<AttachRequest>,
) -> Response {
    match state
        .store
        .attach_to_conversation(&body.file_ids, &conversation_id)
        .await
    {
        Ok(attached) => Json(AttachResponse { attached }).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /v1/conversations/{conversation_id}/files/count
pub async fn count_conversation_files(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
) -> Response {
    match state.store.count_by_conversation(&conversation_id).await {
        Ok(count) => Json(CountResponse { count }).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /health
///
/// Unauthenticated liveness check. Reports `degraded` when storage is not healthy.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let status = match state.store.health_check().await {
        Ok(HealthStatus::Healthy) => "ok",
        _ => "degraded",
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        mock_mode: state.relay.mock_mode(),
    })
}

/// `attachment; filename="..."` with quotes and control characters removed.
fn content_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    format!("attachment; filename=\"{safe}\"")
}
