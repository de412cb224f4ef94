//! Ledger record types.
//!
//! The on-disk shape is a single JSON object keyed by filename:
//!
//! ```json
//! {
//!   "a.bin": {
//!     "date": "2024-05-01 12:30:00",
//!     "size": 5,
//!     "sha256": "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
//!     "status": "ON",
//!     "folder": "main"
//!   }
//! }
//! ```

use crate::constants::LEDGER_DATE_FORMAT;
use chrono::{NaiveDateTime, Timelike};
use patchlist_types::{FileStatus, Folder, Sha256Hash};
use std::collections::BTreeMap;

/// Filename → record. Iteration is in ascending filename order, which is also the order of
/// patchlist lines.
pub type StatusLedger = BTreeMap<String, FileRecord>;

/// Metadata for one tracked file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FileRecord {
    /// Local wall-clock time of the last upload
    #[serde(rename = "date", with = "ledger_date")]
    pub uploaded_at: NaiveDateTime,

    /// Size in bytes at the last upload
    pub size: u64,

    /// Digest of the bytes at the last upload
    #[serde(rename = "sha256")]
    pub digest: Sha256Hash,

    pub status: FileStatus,

    pub folder: Folder,
}

impl FileRecord {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Path of this record's file in the patchlist.
    pub fn patch_path(&self, filename: &str) -> String {
        self.folder.patch_path(filename)
    }
}

/// A record together with its key, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub filename: String,
    pub record: FileRecord,
}

impl FileEntry {
    pub fn from_ledger(ledger: &StatusLedger) -> Vec<FileEntry> {
        ledger
            .iter()
            .map(|(filename, record)| FileEntry {
                filename: filename.clone(),
                record: record.clone(),
            })
            .collect()
    }
}

/// Current local time truncated to whole seconds, the resolution the ledger stores.
pub fn now_for_ledger() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

mod ledger_date {
    use super::LEDGER_DATE_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(LEDGER_DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, LEDGER_DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}
