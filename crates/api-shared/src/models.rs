//! Request and response bodies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Generic outcome of a mutating call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActionRes {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionRes {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusReq {
    pub filename: String,
    /// `ON` or `OFF`
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeleteFileReq {
    pub filename: String,
}

/// Multipart form accepted by `POST /upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UploadForm {
    /// One of `main`, `pack`, `custom`; defaults to `main`
    pub folder: Option<String>,
    /// File parts, sent as `files` or `files[]`
    #[schema(value_type = Vec<String>, format = Binary)]
    pub files: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UploadFileResult {
    /// Name as stored, or as sent when the file was rejected
    pub filename: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UploadRes {
    pub success: bool,
    pub folder: String,
    pub results: Vec<UploadFileResult>,
}

/// One ledger record, in the ledger's own field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileEntryRes {
    pub filename: String,
    /// `YYYY-MM-DD HH:MM:SS`, server local time
    pub date: String,
    pub size: u64,
    pub sha256: String,
    pub status: String,
    pub folder: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListFilesRes {
    pub files: Vec<FileEntryRes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FolderSummaryRes {
    pub files: usize,
    pub active: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SummaryRes {
    pub total_files: usize,
    pub active_files: usize,
    pub inactive_files: usize,
    pub tracked_bytes: u64,
    pub folders: BTreeMap<String, FolderSummaryRes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiskFileRes {
    pub folder: String,
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StaleFileRes {
    pub filename: String,
    pub folder: String,
    pub recorded_sha256: String,
    pub actual_sha256: String,
    pub recorded_size: u64,
    pub actual_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VerifyRes {
    pub clean: bool,
    pub untracked: Vec<DiskFileRes>,
    pub missing: Vec<String>,
    pub stale: Vec<StaleFileRes>,
}
