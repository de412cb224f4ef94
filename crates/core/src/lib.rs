//! # Patchlist Core
//!
//! Business logic for the patch distribution manager:
//! - the status ledger (`file_status.json`) and its single-writer discipline
//! - patchlist (`patcher.txt`) generation
//! - upload, status toggle and delete orchestration over the upload tree
//! - the periodic patchlist refresh
//!
//! **No API concerns**: HTTP routing, request parsing and response shapes belong in `api-rest`
//! and `api-shared`.

pub mod atomic;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod patchlist;
pub mod record;
pub mod report;
pub mod scheduler;
pub mod service;

pub use config::{CoreConfig, LedgerRecovery};
pub use constants::{DEFAULT_PATCHLIST_FILE, DEFAULT_STATUS_FILE, DEFAULT_UPLOAD_DIR};
pub use error::{PatchError, PatchResult};
pub use ledger::LedgerStore;
pub use patchlist::PatchlistGenerator;
pub use record::{FileEntry, FileRecord, StatusLedger};
pub use report::{DriftReport, FolderSummary, StaleEntry, Summary};
pub use scheduler::{refresh_once, spawn_patchlist_refresh};
pub use service::{PatchService, UploadOutcome};

pub use patchlist_files::{hash_file, DiskFile, PendingUpload, UploadStore};
pub use patchlist_types::{FileStatus, Folder, SafeFilename, Sha256Hash};
