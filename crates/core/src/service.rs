//! Patch file service.
//!
//! [`PatchService`] is the single entry point for everything that changes the upload tree, the
//! ledger or the patchlist. HTTP handlers, the CLI and the scheduler all go through it.
//!
//! Each mutating operation follows the same shape:
//!
//! 1. take the ledger writer lock,
//! 2. load the ledger (a malformed ledger aborts here, before anything is touched),
//! 3. stage the filesystem change so it can be undone,
//! 4. save the ledger, undoing the filesystem change if the save fails,
//! 5. commit the filesystem change and regenerate the patchlist while still holding the lock.
//!
//! This keeps "file on disk" and "record in ledger" moving together: a failed operation leaves
//! neither an orphaned record nor an untracked file behind.

use crate::config::CoreConfig;
use crate::ledger::LedgerStore;
use crate::patchlist::PatchlistGenerator;
use crate::record::{now_for_ledger, FileEntry, FileRecord, StatusLedger};
use crate::report::{DriftReport, Summary};
use crate::{PatchError, PatchResult};
use patchlist_files::{PendingUpload, UploadStore, HASH_CHUNK_SIZE};
use patchlist_types::{FileStatus, Folder, SafeFilename};
use std::io::Read;
use std::sync::Arc;

/// Result for one file of an upload batch.
#[derive(Debug)]
pub struct UploadOutcome {
    /// Filename as the client sent it
    pub filename: String,
    pub result: PatchResult<FileEntry>,
}

#[derive(Clone, Debug)]
pub struct PatchService {
    cfg: Arc<CoreConfig>,
    ledger: Arc<LedgerStore>,
    uploads: UploadStore,
    patchlist: PatchlistGenerator,
}

impl PatchService {
    /// Opens the upload tree (creating it if needed) and validates the ledger.
    ///
    /// # Errors
    ///
    /// Returns `PatchError` if:
    /// - the upload directory cannot be created - [`PatchError::Files`]
    /// - the ledger is unreadable, or malformed without reset acknowledgment -
    ///   [`PatchError::LedgerRead`], [`PatchError::MalformedLedger`]
    pub fn open(cfg: Arc<CoreConfig>) -> PatchResult<Self> {
        let uploads = UploadStore::initialise(cfg.upload_dir())?;
        let ledger = LedgerStore::open(cfg.status_file().to_path_buf(), cfg.ledger_recovery())?;
        let patchlist = PatchlistGenerator::new(cfg.patchlist_file().to_path_buf());

        Ok(Self {
            cfg,
            ledger: Arc::new(ledger),
            uploads,
            patchlist,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Snapshot of every tracked file, in filename order.
    pub fn list_files(&self) -> Vec<FileEntry> {
        FileEntry::from_ledger(&self.ledger.load_lenient())
    }

    pub fn get(&self, filename: &str) -> PatchResult<FileEntry> {
        let ledger = self.ledger.load()?;
        ledger
            .get(filename)
            .map(|record| FileEntry {
                filename: filename.to_owned(),
                record: record.clone(),
            })
            .ok_or_else(|| PatchError::NotFound(filename.to_owned()))
    }

    /// Validates a client filename and opens a staging file for its bytes.
    ///
    /// # Errors
    ///
    /// Returns `PatchError` if:
    /// - the name is empty after sanitisation - [`PatchError::InvalidValue`]
    /// - its extension is not on the configured allow-list - [`PatchError::DisallowedExtension`]
    /// - the staging file cannot be created - [`PatchError::Files`]
    pub fn begin_upload(&self, raw_filename: &str) -> PatchResult<PendingUpload> {
        let filename = SafeFilename::new(raw_filename)?;
        if !self.cfg.extension_allowed(&filename) {
            tracing::warn!("skipping {}: extension not allowed", filename);
            return Err(PatchError::DisallowedExtension(filename.to_string()));
        }
        Ok(self.uploads.stage(filename)?)
    }

    /// Places a fully received upload into `folder` and records it as ON.
    ///
    /// An existing record with the same filename is replaced in place. If that record pointed at
    /// a different folder, the old copy is removed once the ledger has been saved.
    pub fn commit_upload(&self, pending: PendingUpload, folder: Folder) -> PatchResult<FileEntry> {
        let sealed = pending.seal()?;
        let filename = sealed.filename().clone();

        let guard = self.ledger.lock();
        let mut ledger = guard.load()?;
        let previous = ledger.get(filename.as_str()).cloned();

        let displaced = self.uploads.stage_removal(folder, &filename)?;
        let stored = match self.uploads.place(sealed, folder) {
            Ok(stored) => stored,
            Err(e) => {
                if let Err(undo) = displaced.rollback() {
                    tracing::error!("failed to restore {} after failed upload: {}", filename, undo);
                }
                return Err(e.into());
            }
        };

        let record = FileRecord {
            uploaded_at: now_for_ledger(),
            size: stored.size,
            digest: stored.digest,
            status: FileStatus::On,
            folder,
        };
        ledger.insert(filename.to_string(), record.clone());

        if let Err(e) = guard.save(&ledger) {
            if let Err(undo) = self.uploads.remove(folder, &filename) {
                tracing::error!("failed to remove {} after ledger save failure: {}", filename, undo);
            }
            if let Err(undo) = displaced.rollback() {
                tracing::error!("failed to restore {} after ledger save failure: {}", filename, undo);
            }
            return Err(e);
        }

        if let Err(e) = displaced.commit() {
            tracing::warn!("replaced {} but could not remove the old copy: {}", filename, e);
        }
        if let Some(prev) = previous.filter(|p| p.folder != folder) {
            match self.uploads.remove(prev.folder, &filename) {
                Ok(_) => tracing::info!("moved {} from {} to {}", filename, prev.folder, folder),
                Err(e) => tracing::warn!(
                    "could not remove old copy of {} from {}: {}",
                    filename,
                    prev.folder,
                    e
                ),
            }
        }

        self.refresh_after_commit(&ledger);
        tracing::info!(
            "uploaded {} to {} ({} bytes, sha256 {})",
            filename,
            folder,
            record.size,
            record.digest
        );

        Ok(FileEntry {
            filename: filename.to_string(),
            record,
        })
    }

    /// Uploads one file from a reader, copying it in bounded chunks.
    pub fn upload<R: Read>(
        &self,
        raw_filename: &str,
        folder: Folder,
        mut reader: R,
    ) -> PatchResult<FileEntry> {
        let mut pending = self.begin_upload(raw_filename)?;
        let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(patchlist_files::FilesError::Io(e).into()),
            };
            pending.write_chunk(&buffer[..n])?;
        }
        self.commit_upload(pending, folder)
    }

    /// Uploads several files into one folder. A failing file is reported in its outcome and
    /// does not stop the rest of the batch.
    pub fn upload_batch<R, I>(&self, folder: Folder, files: I) -> Vec<UploadOutcome>
    where
        R: Read,
        I: IntoIterator<Item = (String, R)>,
    {
        files
            .into_iter()
            .map(|(filename, reader)| {
                let result = self.upload(&filename, folder, reader);
                if let Err(e) = &result {
                    tracing::warn!("upload of {:?} failed: {}", filename, e);
                }
                UploadOutcome { filename, result }
            })
            .collect()
    }

    /// Sets a file's inclusion flag.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::NotFound`] if the filename has no record.
    pub fn set_status(&self, filename: &str, status: FileStatus) -> PatchResult<FileEntry> {
        let guard = self.ledger.lock();
        let mut ledger = guard.load()?;

        let record = ledger
            .get_mut(filename)
            .ok_or_else(|| PatchError::NotFound(filename.to_owned()))?;
        record.status = status;
        let record = record.clone();

        guard.save(&ledger)?;
        self.refresh_after_commit(&ledger);
        tracing::info!("set {} to {}", filename, status);

        Ok(FileEntry {
            filename: filename.to_owned(),
            record,
        })
    }

    /// Deletes a file's bytes and its record together.
    ///
    /// A file that is already missing from disk is tolerated; the record is still removed.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::NotFound`] if the filename has no record. In that case nothing on
    /// disk changes.
    pub fn delete(&self, filename: &str) -> PatchResult<FileRecord> {
        let guard = self.ledger.lock();
        let mut ledger = guard.load()?;

        let record = ledger
            .remove(filename)
            .ok_or_else(|| PatchError::NotFound(filename.to_owned()))?;

        // Keys are written from sanitised names; a key that does not survive sanitisation was
        // edited by hand and is never joined onto a path.
        let removal = match SafeFilename::new(filename) {
            Ok(safe) if safe.as_str() == filename => {
                Some(self.uploads.stage_removal(record.folder, &safe)?)
            }
            _ => {
                tracing::warn!("record {:?} has an unsafe name; leaving disk untouched", filename);
                None
            }
        };

        if let Err(e) = guard.save(&ledger) {
            if let Some(removal) = removal {
                if let Err(undo) = removal.rollback() {
                    tracing::error!("failed to restore {} after ledger save failure: {}", filename, undo);
                }
            }
            return Err(e);
        }

        if let Some(removal) = removal {
            if !removal.was_present() {
                tracing::warn!("{} was already missing from {}", filename, record.folder);
            }
            if let Err(e) = removal.commit() {
                tracing::error!("record for {} removed but file deletion failed: {}", filename, e);
            }
        }

        self.refresh_after_commit(&ledger);
        tracing::info!("deleted {} from {}", filename, record.folder);

        Ok(record)
    }

    /// Re-derives the patchlist from the current ledger. Returns the number of entries.
    pub fn regenerate_patchlist(&self) -> PatchResult<usize> {
        let guard = self.ledger.lock();
        let ledger = guard.load()?;
        self.patchlist.write(&ledger)
    }

    pub fn read_patchlist(&self) -> PatchResult<String> {
        self.patchlist.read()
    }

    pub fn summary(&self) -> Summary {
        Summary::from_ledger(&self.ledger.load_lenient())
    }

    /// Compares the ledger against the upload tree. Read-only.
    pub fn verify(&self) -> PatchResult<DriftReport> {
        let ledger = self.ledger.load()?;
        DriftReport::compute(&ledger, &self.uploads)
    }

    /// The ledger change is already durable at this point, so a patchlist failure is logged
    /// rather than reported; the periodic refresh rewrites it.
    fn refresh_after_commit(&self, ledger: &StatusLedger) {
        if let Err(e) = self.patchlist.write(ledger) {
            tracing::error!("patchlist regeneration failed: {}", e);
        }
    }
}
