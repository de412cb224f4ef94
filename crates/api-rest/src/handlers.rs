//! HTTP handlers.
//!
//! Handlers parse the request, hand the work to [`PatchService`] on the blocking pool and shape
//! the response. They never touch the ledger or the upload tree directly.

use crate::convert;
use crate::error::{bad_request, failure, ApiFailure};
use crate::AppState;
use api_shared::{
    ActionRes, DeleteFileReq, HealthRes, HealthService, ListFilesRes, SummaryRes,
    UpdateStatusReq, UploadFileResult, UploadForm, UploadRes, VerifyRes,
};
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use patchlist_core::{FileStatus, Folder, PatchError, PatchResult, PatchService, PendingUpload};
use utoipa::OpenApi;

/// Runs service work on the blocking pool.
async fn blocking<T, F>(f: F) -> PatchResult<T>
where
    F: FnOnce() -> PatchResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PatchError::Task(e.to_string()))?
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
#[axum::debug_handler]
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/files",
    responses(
        (status = 200, description = "Every tracked file, in filename order", body = ListFilesRes),
        (status = 500, description = "Internal server error", body = ActionRes)
    )
)]
/// List the status ledger.
///
/// An unreadable ledger is logged and listed as empty.
#[axum::debug_handler]
pub async fn list_files(
    State(state): State<AppState>,
) -> Result<Json<ListFilesRes>, ApiFailure> {
    let service = state.service.clone();
    let entries = blocking(move || Ok(service.list_files()))
        .await
        .map_err(failure)?;
    Ok(Json(ListFilesRes {
        files: entries.into_iter().map(convert::file_entry).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Per-file upload results", body = UploadRes),
        (status = 400, description = "Malformed form, unknown folder or no files", body = ActionRes),
        (status = 500, description = "Internal server error", body = ActionRes)
    )
)]
/// Upload one or more patch files.
///
/// File parts are streamed to staging files as they arrive. The `folder` part may appear
/// anywhere in the form, so files are only placed once the whole form has been read. A file
/// that fails is reported in its result and does not stop the others; `success` is true only
/// when every file was stored.
#[axum::debug_handler]
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadRes>, ApiFailure> {
    let mut multipart = multipart.map_err(|e| bad_request(e.body_text()))?;

    let mut folder = Folder::default();
    let mut staged: Vec<(String, PatchResult<PendingUpload>)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("folder") => {
                let value = field.text().await.map_err(|e| bad_request(e.body_text()))?;
                folder = value
                    .parse::<Folder>()
                    .map_err(|e| failure(PatchError::from(e)))?;
            }
            Some("files") | Some("files[]") => {
                let raw = field.file_name().unwrap_or_default().to_owned();
                if raw.is_empty() {
                    // Browsers send an empty part when no file was chosen.
                    continue;
                }
                let pending = receive_file(&state.service, &raw, field)
                    .await
                    .map_err(|e| bad_request(e.body_text()))?;
                staged.push((raw, pending));
            }
            other => tracing::debug!("ignoring form field {:?}", other),
        }
    }

    if staged.is_empty() {
        return Err(bad_request("no files in upload"));
    }

    let service = state.service.clone();
    let results = blocking(move || {
        Ok(staged
            .into_iter()
            .map(|(raw, pending)| {
                match pending.and_then(|p| service.commit_upload(p, folder)) {
                    Ok(entry) => UploadFileResult {
                        sha256: Some(entry.record.digest.to_string()),
                        size: Some(entry.record.size),
                        filename: entry.filename,
                        success: true,
                        error: None,
                    },
                    Err(e) => {
                        tracing::warn!("upload of {:?} failed: {}", raw, e);
                        UploadFileResult {
                            filename: raw,
                            success: false,
                            sha256: None,
                            size: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            })
            .collect::<Vec<_>>())
    })
    .await
    .map_err(failure)?;

    Ok(Json(UploadRes {
        success: results.iter().all(|r| r.success),
        folder: folder.to_string(),
        results,
    }))
}

/// Bytes buffered from a file part before they are handed to the blocking pool.
const UPLOAD_WRITE_BATCH: usize = 256 * 1024;

/// Streams one file part into a staging file.
///
/// Chunks are collected into batches of [`UPLOAD_WRITE_BATCH`] bytes and every file operation
/// runs on the blocking pool. The outer error is a broken request body and aborts the whole
/// form. The inner result is this file's own outcome.
async fn receive_file(
    service: &PatchService,
    raw: &str,
    mut field: Field<'_>,
) -> Result<PatchResult<PendingUpload>, MultipartError> {
    let svc = service.clone();
    let name = raw.to_owned();
    let mut pending = match blocking(move || svc.begin_upload(&name)).await {
        Ok(pending) => pending,
        Err(e) => return Ok(Err(e)),
    };

    let mut batch = Vec::with_capacity(UPLOAD_WRITE_BATCH);
    while let Some(chunk) = field.chunk().await? {
        batch.extend_from_slice(&chunk);
        if batch.len() >= UPLOAD_WRITE_BATCH {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(UPLOAD_WRITE_BATCH));
            pending = match write_batch(pending, full).await {
                Ok(pending) => pending,
                Err(e) => return Ok(Err(e)),
            };
        }
    }
    if !batch.is_empty() {
        pending = match write_batch(pending, batch).await {
            Ok(pending) => pending,
            Err(e) => return Ok(Err(e)),
        };
    }
    Ok(Ok(pending))
}

async fn write_batch(mut pending: PendingUpload, batch: Vec<u8>) -> PatchResult<PendingUpload> {
    blocking(move || {
        pending.write_chunk(&batch)?;
        Ok(pending)
    })
    .await
}

#[utoipa::path(
    post,
    path = "/update_status",
    request_body = UpdateStatusReq,
    responses(
        (status = 200, description = "Status updated", body = ActionRes),
        (status = 400, description = "Bad request", body = ActionRes),
        (status = 404, description = "Unknown filename", body = ActionRes),
        (status = 500, description = "Internal server error", body = ActionRes)
    )
)]
/// Turn a file ON or OFF in the patchlist.
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    req: Result<Json<UpdateStatusReq>, JsonRejection>,
) -> Result<Json<ActionRes>, ApiFailure> {
    let Json(req) = req.map_err(|e| bad_request(e.body_text()))?;
    let status: FileStatus = req
        .status
        .parse()
        .map_err(|e| failure(PatchError::from(e)))?;

    let service = state.service.clone();
    blocking(move || service.set_status(&req.filename, status))
        .await
        .map_err(failure)?;
    Ok(Json(ActionRes::ok()))
}

#[utoipa::path(
    post,
    path = "/delete_file",
    request_body = DeleteFileReq,
    responses(
        (status = 200, description = "File and record removed", body = ActionRes),
        (status = 400, description = "Bad request", body = ActionRes),
        (status = 404, description = "Unknown filename", body = ActionRes),
        (status = 500, description = "Internal server error", body = ActionRes)
    )
)]
/// Delete a file from disk and from the ledger.
#[axum::debug_handler]
pub async fn delete_file(
    State(state): State<AppState>,
    req: Result<Json<DeleteFileReq>, JsonRejection>,
) -> Result<Json<ActionRes>, ApiFailure> {
    let Json(req) = req.map_err(|e| bad_request(e.body_text()))?;

    let service = state.service.clone();
    blocking(move || service.delete(&req.filename))
        .await
        .map_err(failure)?;
    Ok(Json(ActionRes::ok()))
}

#[utoipa::path(
    get,
    path = "/patchlist",
    responses(
        (status = 200, description = "Current patchlist document", body = String, content_type = "text/plain"),
        (status = 404, description = "Patchlist not generated yet", body = ActionRes)
    )
)]
/// Serve the patchlist exactly as written on disk.
#[axum::debug_handler]
pub async fn patchlist(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiFailure> {
    let service = state.service.clone();
    let text = blocking(move || service.read_patchlist())
        .await
        .map_err(failure)?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

#[utoipa::path(
    post,
    path = "/generate",
    responses(
        (status = 200, description = "Patchlist regenerated", body = ActionRes),
        (status = 500, description = "Internal server error", body = ActionRes)
    )
)]
#[axum::debug_handler]
pub async fn generate(State(state): State<AppState>) -> Result<Json<ActionRes>, ApiFailure> {
    let service = state.service.clone();
    let entries = blocking(move || service.regenerate_patchlist())
        .await
        .map_err(failure)?;
    tracing::info!("patchlist regenerated on request ({} entries)", entries);
    Ok(Json(ActionRes::ok()))
}

#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Counts and bytes per folder", body = SummaryRes),
        (status = 500, description = "Internal server error", body = ActionRes)
    )
)]
#[axum::debug_handler]
pub async fn status(State(state): State<AppState>) -> Result<Json<SummaryRes>, ApiFailure> {
    let service = state.service.clone();
    let summary = blocking(move || Ok(service.summary()))
        .await
        .map_err(failure)?;
    Ok(Json(convert::summary(summary)))
}

#[utoipa::path(
    get,
    path = "/verify",
    responses(
        (status = 200, description = "Differences between the ledger and the upload tree", body = VerifyRes),
        (status = 500, description = "Internal server error", body = ActionRes)
    )
)]
/// Compare the ledger with the upload tree. Nothing is changed.
#[axum::debug_handler]
pub async fn verify(State(state): State<AppState>) -> Result<Json<VerifyRes>, ApiFailure> {
    let service = state.service.clone();
    let report = blocking(move || service.verify())
        .await
        .map_err(failure)?;
    Ok(Json(convert::drift_report(report)))
}

#[axum::debug_handler]
pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(crate::ApiDoc::openapi())
}
