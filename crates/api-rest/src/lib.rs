//! # API REST
//!
//! REST API for the patchlist manager.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - the OpenAPI document, served as JSON
//! - REST-specific concerns (multipart parsing, JSON serialisation, CORS)
//!
//! Uses `api-shared` for wire types and `patchlist-core` for everything else.

#![warn(rust_2018_idioms)]

mod convert;
pub mod error;
pub mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use patchlist_core::PatchService;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: PatchService,
}

impl AppState {
    pub fn new(service: PatchService) -> Self {
        Self { service }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_files,
        handlers::upload,
        handlers::update_status,
        handlers::delete_file,
        handlers::patchlist,
        handlers::generate,
        handlers::status,
        handlers::verify,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ActionRes,
        api_shared::UpdateStatusReq,
        api_shared::DeleteFileReq,
        api_shared::UploadForm,
        api_shared::UploadRes,
        api_shared::UploadFileResult,
        api_shared::FileEntryRes,
        api_shared::ListFilesRes,
        api_shared::SummaryRes,
        api_shared::FolderSummaryRes,
        api_shared::VerifyRes,
        api_shared::DiskFileRes,
        api_shared::StaleFileRes,
    ))
)]
pub struct ApiDoc;

/// Builds the application router.
///
/// Uploads are streamed to disk, so the default request body limit is lifted on `/upload` only.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/files", get(handlers::list_files))
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/update_status", post(handlers::update_status))
        .route("/delete_file", post(handlers::delete_file))
        .route("/patchlist", get(handlers::patchlist))
        .route("/generate", post(handlers::generate))
        .route("/status", get(handlers::status))
        .route("/verify", get(handlers::verify))
        .route("/api-docs/openapi.json", get(handlers::openapi))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
