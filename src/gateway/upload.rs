//! `POST /api/upload`: multipart in, server-push frames out.

use super::AppState;
use crate::error::RelayError;
use crate::extract::{self, MediaType, UploadedFile, MAX_UPLOAD_BYTES};
use crate::prompt;
use crate::providers::FragmentStream;
use crate::spool::SpooledUpload;
use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::TryStreamExt;
use serde_json::json;

pub const EMPTY_INPUT_MSG: &str = "No message or file provided";
pub const SIZE_LIMIT_MSG: &str = "File size exceeds the 4MB limit.";
pub const UNSUPPORTED_TYPE_MSG: &str = "Only text and PDF files are supported.";
pub const SERVER_ERROR_MSG: &str = "Failed to process the request.";

pub async fn upload(State(state): State<AppState>, multipart: Multipart) -> Response {
    match relay(state, multipart).await {
        Ok(fragments) => stream_response(fragments),
        Err(err) => error_response(&err),
    }
}

/// The relay core: receive fields, stage and extract the file, assemble the
/// prompt, open the model stream. Everything here happens before the
/// response is committed, so any failure still maps to a JSON error.
async fn relay(state: AppState, mut multipart: Multipart) -> Result<FragmentStream, RelayError> {
    let mut message: Option<String> = None;
    let mut upload: Option<UploadedFile> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::TransportFailure(e.to_string()))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("message") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| RelayError::TransportFailure(e.to_string()))?;
                message = Some(text);
            }
            Some("file") => {
                let original_name = field.file_name().unwrap_or("upload.bin").to_string();
                let declared = field.content_type().unwrap_or("").to_string();
                // Reject disallowed types before a single byte is staged.
                let media_type = MediaType::from_declared(&declared)
                    .ok_or(RelayError::UnsupportedType(declared))?;

                let mut data = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| RelayError::TransportFailure(e.to_string()))?
                {
                    if (data.len() + chunk.len()) as u64 > MAX_UPLOAD_BYTES {
                        return Err(RelayError::SizeLimitExceeded {
                            limit_bytes: MAX_UPLOAD_BYTES,
                        });
                    }
                    data.extend_from_slice(&chunk);
                }

                let size_bytes = data.len() as u64;
                let spool = SpooledUpload::write(&state.spool_dir, &original_name, &data)
                    .await
                    .map_err(|e| RelayError::TransportFailure(e.to_string()))?;
                upload = Some(UploadedFile {
                    spool,
                    media_type,
                    size_bytes,
                    original_name,
                });
            }
            _ => {}
        }
    }

    let file_text = match upload {
        Some(file) => {
            let extracted = extract::extract(&file).await;
            // Delete the staged blob on success and failure alike, before
            // any response is produced.
            if let Err(e) = file.spool.remove().await {
                tracing::warn!(error = %e, "failed to remove spooled upload");
            }
            Some(extracted?)
        }
        None => None,
    };

    let prompt = prompt::assemble(message.as_deref(), file_text.as_deref())?;
    tracing::info!(prompt_bytes = prompt.len(), "invoking model");
    state.invoker.invoke(&prompt).await
}

/// Frame each fragment as `data: <fragment>\n\n` and stream it out as its
/// own body chunk; hyper flushes per chunk, so delivery is immediate. An
/// `Err` item aborts the connection with no structured error frame - the
/// status and headers are already committed by then.
fn stream_response(fragments: FragmentStream) -> Response {
    let frames = fragments.map_ok(|text| format!("data: {text}\n\n"));
    let built = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(frames));
    match built {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "failed to build stream response");
            error_response(&RelayError::TransportFailure(e.to_string()))
        }
    }
}

fn error_response(err: &RelayError) -> Response {
    let (status, message) = match err {
        RelayError::EmptyInput => (StatusCode::BAD_REQUEST, EMPTY_INPUT_MSG),
        RelayError::SizeLimitExceeded { .. } => (StatusCode::BAD_REQUEST, SIZE_LIMIT_MSG),
        RelayError::UnsupportedType(declared) => {
            tracing::debug!(%declared, "rejected upload media type");
            (StatusCode::BAD_REQUEST, UNSUPPORTED_TYPE_MSG)
        }
        _ => {
            tracing::error!(error = %err, "request failed before streaming");
            (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MSG)
        }
    };
    (status, Json(json!({ "error": message }))).into_response()
}
