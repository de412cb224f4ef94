//! Read-only views over the ledger and upload tree.

use crate::record::StatusLedger;
use crate::PatchResult;
use patchlist_files::{hash_file, DiskFile, UploadStore};
use patchlist_types::{Folder, Sha256Hash};
use std::collections::{BTreeMap, BTreeSet};

/// Per-folder counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub files: usize,
    pub active: usize,
    pub bytes: u64,
}

/// Counts and sizes of tracked files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total_files: usize,
    pub active_files: usize,
    pub inactive_files: usize,
    /// Sum of recorded sizes of every tracked file
    pub tracked_bytes: u64,
    /// Always contains every folder, including empty ones
    pub folders: BTreeMap<Folder, FolderSummary>,
}

impl Summary {
    pub fn from_ledger(ledger: &StatusLedger) -> Self {
        let mut summary = Summary {
            folders: Folder::ALL
                .into_iter()
                .map(|f| (f, FolderSummary::default()))
                .collect(),
            ..Default::default()
        };

        for record in ledger.values() {
            summary.total_files += 1;
            summary.tracked_bytes += record.size;
            if record.is_active() {
                summary.active_files += 1;
            } else {
                summary.inactive_files += 1;
            }

            let folder = summary.folders.entry(record.folder).or_default();
            folder.files += 1;
            folder.bytes += record.size;
            if record.is_active() {
                folder.active += 1;
            }
        }

        summary
    }
}

/// A tracked file whose bytes no longer match its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleEntry {
    pub filename: String,
    pub folder: Folder,
    pub recorded_digest: Sha256Hash,
    pub actual_digest: Sha256Hash,
    pub recorded_size: u64,
    pub actual_size: u64,
}

/// Disagreements between the ledger and the upload tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftReport {
    /// Files on disk with no record in their folder
    pub untracked: Vec<DiskFile>,
    /// Records whose file is not on disk in the recorded folder
    pub missing: Vec<String>,
    /// Records whose file is present but has different content
    pub stale: Vec<StaleEntry>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.untracked.is_empty() && self.missing.is_empty() && self.stale.is_empty()
    }

    /// Compares `ledger` against the upload tree, re-hashing every tracked file.
    pub fn compute(ledger: &StatusLedger, store: &UploadStore) -> PatchResult<Self> {
        let on_disk: BTreeMap<(Folder, String), DiskFile> = store
            .scan()?
            .into_iter()
            .map(|f| ((f.folder, f.filename.clone()), f))
            .collect();

        let mut report = DriftReport::default();
        let mut tracked = BTreeSet::new();

        for (filename, record) in ledger {
            let key = (record.folder, filename.clone());
            let Some(disk) = on_disk.get(&key) else {
                report.missing.push(filename.clone());
                continue;
            };
            tracked.insert(key);

            let path = store.folder_directory(record.folder).join(&disk.filename);
            match hash_file(&path) {
                Ok(actual) if actual == record.digest && disk.size == record.size => {}
                Ok(actual) => report.stale.push(StaleEntry {
                    filename: filename.clone(),
                    folder: record.folder,
                    recorded_digest: record.digest.clone(),
                    actual_digest: actual,
                    recorded_size: record.size,
                    actual_size: disk.size,
                }),
                Err(e) => {
                    tracing::warn!("could not hash {}: {}", path.display(), e);
                    report.missing.push(filename.clone());
                }
            }
        }

        report.untracked = on_disk
            .into_iter()
            .filter(|(key, _)| !tracked.contains(key))
            .map(|(_, file)| file)
            .collect();

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{now_for_ledger, FileRecord};
    use patchlist_files::hash_reader;
    use patchlist_types::{FileStatus, SafeFilename};
    use std::fs;
    use tempfile::TempDir;

    fn record(folder: Folder, status: FileStatus, content: &[u8]) -> FileRecord {
        FileRecord {
            uploaded_at: now_for_ledger(),
            size: content.len() as u64,
            digest: hash_reader(content).unwrap(),
            status,
            folder,
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut ledger = StatusLedger::new();
        ledger.insert("a.bin".into(), record(Folder::Main, FileStatus::On, b"hello"));
        ledger.insert("b.bin".into(), record(Folder::Main, FileStatus::Off, b"hi"));
        ledger.insert("c.grf".into(), record(Folder::Pack, FileStatus::On, b"abc"));

        let summary = Summary::from_ledger(&ledger);

        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.active_files, 2);
        assert_eq!(summary.inactive_files, 1);
        assert_eq!(summary.tracked_bytes, 10);
        assert_eq!(
            summary.folders[&Folder::Main],
            FolderSummary {
                files: 2,
                active: 1,
                bytes: 7
            }
        );
        assert_eq!(summary.folders[&Folder::Custom], FolderSummary::default());
    }

    #[test]
    fn test_drift_report() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::initialise(temp.path()).unwrap();
        let write = |folder: Folder, name: &str, bytes: &[u8]| {
            let path = store.file_path(folder, &SafeFilename::new(name).unwrap());
            fs::write(path, bytes).unwrap();
        };

        write(Folder::Main, "ok.bin", b"hello");
        write(Folder::Main, "changed.bin", b"new content");
        write(Folder::Pack, "stray.bin", b"x");
        write(Folder::Custom, "moved.bin", b"m");

        let mut ledger = StatusLedger::new();
        ledger.insert("ok.bin".into(), record(Folder::Main, FileStatus::On, b"hello"));
        ledger.insert(
            "changed.bin".into(),
            record(Folder::Main, FileStatus::On, b"old"),
        );
        ledger.insert("gone.bin".into(), record(Folder::Main, FileStatus::Off, b"g"));
        ledger.insert("moved.bin".into(), record(Folder::Pack, FileStatus::On, b"m"));

        let report = DriftReport::compute(&ledger, &store).unwrap();

        assert!(!report.is_clean());
        assert_eq!(report.missing, vec!["gone.bin".to_string(), "moved.bin".to_string()]);
        assert_eq!(report.stale.len(), 1);
        assert_eq!(report.stale[0].filename, "changed.bin");
        assert_eq!(report.stale[0].actual_size, 11);
        let untracked: Vec<_> = report
            .untracked
            .iter()
            .map(|f| (f.folder, f.filename.as_str()))
            .collect();
        assert_eq!(
            untracked,
            vec![(Folder::Pack, "stray.bin"), (Folder::Custom, "moved.bin")]
        );
    }

    #[test]
    fn test_drift_report_clean() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::initialise(temp.path()).unwrap();
        fs::write(
            store.file_path(Folder::Main, &SafeFilename::new("a.bin").unwrap()),
            b"hello",
        )
        .unwrap();

        let mut ledger = StatusLedger::new();
        ledger.insert("a.bin".into(), record(Folder::Main, FileStatus::On, b"hello"));

        assert!(DriftReport::compute(&ledger, &store).unwrap().is_clean());
    }
}
