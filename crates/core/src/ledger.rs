//! Status ledger persistence.
//!
//! The ledger is a JSON document mapping filename to [`FileRecord`]. [`LedgerStore`] is the only
//! code that reads or writes it.
//!
//! ## Writers and readers
//!
//! Every mutation is a load-modify-save cycle performed while holding the store's writer lock,
//! obtained through [`LedgerStore::lock`]. Two concurrent uploads therefore cannot both load the
//! same snapshot and have one silently discard the other's record.
//!
//! Readers do not take the lock. Saves replace the document with an atomic rename, so a reader
//! always parses a complete document: either the one before a save or the one after it.
//!
//! ## Malformed documents
//!
//! [`LedgerStore::load`] reports a document it cannot parse as
//! [`PatchError::MalformedLedger`]. Write paths propagate that error, so a corrupt ledger is
//! never overwritten by an empty one. Only read-only views use [`LedgerStore::load_lenient`],
//! which logs the failure and shows an empty ledger.

use crate::atomic::write_atomic;
use crate::config::LedgerRecovery;
use crate::constants::CORRUPT_SUFFIX_FORMAT;
use crate::record::{FileRecord, StatusLedger};
use crate::{PatchError, PatchResult};
use parking_lot::{Mutex, MutexGuard};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct LedgerStore {
    path: PathBuf,
    writer: Mutex<()>,
    #[cfg(test)]
    fail_saves: std::sync::atomic::AtomicBool,
}

impl LedgerStore {
    /// Creates a store for the document at `path` without touching the filesystem.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            writer: Mutex::new(()),
            #[cfg(test)]
            fail_saves: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Creates a store and validates the existing document.
    ///
    /// A missing document is fine. A malformed one is handled according to `recovery`:
    /// [`LedgerRecovery::Refuse`] returns the parse error, [`LedgerRecovery::MoveAside`] renames
    /// the document to `<name>.corrupt-<timestamp>` and continues with an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns `PatchError` if:
    /// - the document cannot be read - [`PatchError::LedgerRead`]
    /// - the document is malformed and recovery is refused - [`PatchError::MalformedLedger`]
    /// - the corrupt document cannot be moved aside - [`PatchError::FileWrite`]
    pub fn open(path: PathBuf, recovery: LedgerRecovery) -> PatchResult<Self> {
        let store = Self::new(path);

        match store.load() {
            Ok(ledger) => {
                tracing::info!(
                    "ledger {} loaded with {} records",
                    store.path.display(),
                    ledger.len()
                );
                Ok(store)
            }
            Err(PatchError::MalformedLedger { path, source }) => match recovery {
                LedgerRecovery::Refuse => Err(PatchError::MalformedLedger { path, source }),
                LedgerRecovery::MoveAside => {
                    let aside = corrupt_path(&path);
                    fs::rename(&path, &aside).map_err(|e| PatchError::FileWrite {
                        path: aside.clone(),
                        source: e,
                    })?;
                    tracing::warn!(
                        "ledger {} was malformed ({}); moved to {} and starting empty",
                        path.display(),
                        source,
                        aside.display()
                    );
                    Ok(store)
                }
            },
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current ledger.
    ///
    /// An absent document, or one containing only whitespace, is an empty ledger.
    pub fn load(&self) -> PatchResult<StatusLedger> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StatusLedger::new()),
            Err(e) => {
                return Err(PatchError::LedgerRead {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        if contents.trim().is_empty() {
            tracing::warn!("ledger {} is empty; treating as no records", self.path.display());
            return Ok(StatusLedger::new());
        }

        serde_json::from_str(&contents).map_err(|source| PatchError::MalformedLedger {
            path: self.path.clone(),
            source,
        })
    }

    /// Reads the ledger for display, substituting an empty ledger on any failure.
    ///
    /// Never use the result as the basis of a save.
    pub fn load_lenient(&self) -> StatusLedger {
        match self.load() {
            Ok(ledger) => ledger,
            Err(e) => {
                tracing::error!("ledger unavailable, showing no records: {}", e);
                StatusLedger::new()
            }
        }
    }

    /// Replaces the persisted ledger with `ledger`.
    pub fn save(&self, ledger: &StatusLedger) -> PatchResult<()> {
        self.lock().save(ledger)
    }

    /// Inserts or replaces one record. Returns the record it replaced, if any.
    pub fn upsert(&self, filename: &str, record: FileRecord) -> PatchResult<Option<FileRecord>> {
        let guard = self.lock();
        let mut ledger = guard.load()?;
        let previous = ledger.insert(filename.to_owned(), record);
        guard.save(&ledger)?;
        Ok(previous)
    }

    /// Removes one record and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::NotFound`] if no record has that filename; the document is not
    /// rewritten in that case.
    pub fn remove(&self, filename: &str) -> PatchResult<FileRecord> {
        let guard = self.lock();
        let mut ledger = guard.load()?;
        let removed = ledger
            .remove(filename)
            .ok_or_else(|| PatchError::NotFound(filename.to_owned()))?;
        guard.save(&ledger)?;
        Ok(removed)
    }

    /// Takes the writer lock. Hold the guard for the whole load-modify-save cycle.
    pub fn lock(&self) -> LedgerGuard<'_> {
        LedgerGuard {
            store: self,
            _writer: self.writer.lock(),
        }
    }

    /// Makes every following save fail with a write error until turned off again.
    #[cfg(test)]
    pub(crate) fn fail_saves(&self, fail: bool) {
        self.fail_saves
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    fn write_document(&self, ledger: &StatusLedger) -> PatchResult<()> {
        #[cfg(test)]
        if self.fail_saves.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(PatchError::FileWrite {
                path: self.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "save disabled by test"),
            });
        }

        let mut json = serde_json::to_vec_pretty(ledger).map_err(PatchError::Serialization)?;
        json.push(b'\n');
        write_atomic(&self.path, &json)
    }
}

/// Exclusive write access to the ledger.
pub struct LedgerGuard<'a> {
    store: &'a LedgerStore,
    _writer: MutexGuard<'a, ()>,
}

impl LedgerGuard<'_> {
    pub fn load(&self) -> PatchResult<StatusLedger> {
        self.store.load()
    }

    pub fn save(&self, ledger: &StatusLedger) -> PatchResult<()> {
        self.store.write_document(ledger)
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format(CORRUPT_SUFFIX_FORMAT);
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "ledger".into());
    name.push(format!(".corrupt-{}", stamp));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::now_for_ledger;
    use patchlist_types::{FileStatus, Folder, Sha256Hash};
    use std::sync::Arc;
    use tempfile::TempDir;

    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn record(folder: Folder, status: FileStatus) -> FileRecord {
        FileRecord {
            uploaded_at: now_for_ledger(),
            size: 5,
            digest: Sha256Hash::parse(HELLO).unwrap(),
            status,
            folder,
        }
    }

    fn store(temp: &TempDir) -> LedgerStore {
        LedgerStore::new(temp.path().join("file_status.json"))
    }

    #[test]
    fn test_load_missing_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(store(&temp).load().unwrap().is_empty());
    }

    #[test]
    fn test_load_whitespace_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        fs::write(store.path(), "  \n").unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_malformed_is_error() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(
            store.load(),
            Err(PatchError::MalformedLedger { .. })
        ));
        assert!(store.load_lenient().is_empty());
    }

    #[test]
    fn test_load_reads_compact_legacy_document() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let legacy = format!(
            r#"{{"a.bin": {{"date": "2024-05-01 12:30:00", "size": 5, "sha256": "{}", "status": "OFF", "folder": "main"}}}}"#,
            HELLO
        );
        fs::write(store.path(), legacy).unwrap();

        let ledger = store.load().unwrap();
        let rec = &ledger["a.bin"];
        assert_eq!(rec.status, FileStatus::Off);
        assert_eq!(rec.folder, Folder::Main);
        assert_eq!(rec.size, 5);
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        let mut ledger = StatusLedger::new();
        ledger.insert("a.bin".into(), record(Folder::Main, FileStatus::On));
        ledger.insert("b.grf".into(), record(Folder::Pack, FileStatus::Off));
        store.save(&ledger).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, ledger);

        let before = fs::read(store.path()).unwrap();
        store.save(&store.load().unwrap()).unwrap();
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_upsert_and_remove() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        let previous = store
            .upsert("a.bin", record(Folder::Main, FileStatus::On))
            .unwrap();
        assert!(previous.is_none());

        let previous = store
            .upsert("a.bin", record(Folder::Pack, FileStatus::On))
            .unwrap();
        assert_eq!(previous.unwrap().folder, Folder::Main);
        assert_eq!(store.load().unwrap().len(), 1);

        let removed = store.remove("a.bin").unwrap();
        assert_eq!(removed.folder, Folder::Pack);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_remove_unknown_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        store
            .upsert("a.bin", record(Folder::Main, FileStatus::On))
            .unwrap();
        let before = fs::read(store.path()).unwrap();

        assert!(matches!(
            store.remove("missing.bin"),
            Err(PatchError::NotFound(_))
        ));
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_mutation_never_overwrites_malformed_document() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        fs::write(store.path(), "[1, 2").unwrap();

        let result = store.upsert("a.bin", record(Folder::Main, FileStatus::On));

        assert!(matches!(result, Err(PatchError::MalformedLedger { .. })));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[1, 2");
    }

    #[test]
    fn test_open_refuses_malformed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file_status.json");
        fs::write(&path, "garbage").unwrap();

        let result = LedgerStore::open(path.clone(), LedgerRecovery::Refuse);

        assert!(matches!(result, Err(PatchError::MalformedLedger { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), "garbage");
    }

    #[test]
    fn test_open_moves_malformed_aside() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file_status.json");
        fs::write(&path, "garbage").unwrap();

        let store = LedgerStore::open(path.clone(), LedgerRecovery::MoveAside).unwrap();

        assert!(!path.exists());
        assert!(store.load().unwrap().is_empty());
        let aside: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(aside.len(), 1);
        assert!(aside[0].starts_with("file_status.json.corrupt-"));
    }

    #[test]
    fn test_concurrent_upserts_are_not_lost() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(store(&temp));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..5 {
                        store
                            .upsert(
                                &format!("f{}_{}.bin", i, j),
                                record(Folder::Main, FileStatus::On),
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.load().unwrap().len(), 40);
    }
}
