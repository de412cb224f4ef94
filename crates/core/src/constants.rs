//! Constants used throughout the patchlist core crate.
//!
//! Defaults mirror the `.env` written by `patchctl setup`, so a fresh checkout behaves the same
//! with or without an environment file.

/// Default upload root when `UPLOAD_FOLDER` is unset.
pub const DEFAULT_UPLOAD_DIR: &str = "static/uploads";

/// Default path of the patchlist document.
pub const DEFAULT_PATCHLIST_FILE: &str = "patcher.txt";

/// Default path of the status ledger document.
pub const DEFAULT_STATUS_FILE: &str = "file_status.json";

/// Default patchlist refresh interval, in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

/// Format of the `date` field in the status ledger.
pub const LEDGER_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp suffix appended to a corrupt ledger when it is moved aside.
pub const CORRUPT_SUFFIX_FORMAT: &str = "%Y%m%d%H%M%S";
