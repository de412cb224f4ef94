//! Upload tree storage
//!
//! [`UploadStore`] places uploaded bytes at `<root>/<folder>/<filename>` and removes them again.
//! Every write goes through a temp file that is renamed into place, and every removal can be
//! staged first so the caller can commit or undo it once the ledger has been updated.
//!
//! # Lifecycle of an upload
//!
//! 1. [`UploadStore::stage`] opens a temp file under the root.
//! 2. The caller streams bytes in with [`PendingUpload::write_chunk`].
//! 3. [`PendingUpload::seal`] flushes to disk and computes the digest of what actually landed.
//! 4. [`UploadStore::place`] renames the sealed file into its folder.
//!
//! Dropping a pending or sealed upload deletes its temp file, so an abandoned request leaves
//! nothing behind.

use crate::{hash_file, io_context, FilesError, REMOVAL_SUFFIX, STAGING_PREFIX};
use patchlist_types::{Folder, SafeFilename, Sha256Hash};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// An upload whose bytes are still arriving.
#[derive(Debug)]
pub struct PendingUpload {
    filename: SafeFilename,
    file: NamedTempFile,
    size: u64,
}

impl PendingUpload {
    pub fn filename(&self) -> &SafeFilename {
        &self.filename
    }

    /// Bytes written so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Appends a chunk to the temp file.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), FilesError> {
        self.file.write_all(chunk).map_err(|e| {
            io_context(
                e,
                format!("Failed to write upload chunk for {}", self.filename),
            )
        })?;
        self.size += chunk.len() as u64;
        Ok(())
    }

    /// Flushes the upload to stable storage and hashes the bytes on disk.
    ///
    /// The digest is computed by re-reading the temp file rather than from the stream, so it
    /// describes exactly what will be renamed into place.
    pub fn seal(mut self) -> Result<SealedUpload, FilesError> {
        self.file
            .flush()
            .and_then(|_| self.file.as_file().sync_all())
            .map_err(|e| io_context(e, format!("Failed to flush upload {}", self.filename)))?;

        let digest = hash_file(self.file.path())?;
        let size = self
            .file
            .as_file()
            .metadata()
            .map_err(|e| io_context(e, format!("Failed to stat upload {}", self.filename)))?
            .len();

        Ok(SealedUpload {
            filename: self.filename,
            file: self.file,
            size,
            digest,
        })
    }
}

/// A fully written, hashed upload waiting to be placed into a folder.
#[derive(Debug)]
pub struct SealedUpload {
    filename: SafeFilename,
    file: NamedTempFile,
    size: u64,
    digest: Sha256Hash,
}

impl SealedUpload {
    pub fn filename(&self) -> &SafeFilename {
        &self.filename
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn digest(&self) -> &Sha256Hash {
        &self.digest
    }
}

/// A file that has been placed into the upload tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub filename: SafeFilename,
    pub folder: Folder,
    pub path: PathBuf,
    pub size: u64,
    pub digest: Sha256Hash,
}

/// A file found while scanning the upload tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiskFile {
    pub folder: Folder,
    pub filename: String,
    pub size: u64,
}

/// A removal that has moved the file aside but not yet deleted it.
///
/// Call [`StagedRemoval::commit`] once the ledger no longer references the file, or
/// [`StagedRemoval::rollback`] to put it back.
#[derive(Debug)]
#[must_use = "a staged removal must be committed or rolled back"]
pub struct StagedRemoval {
    original: PathBuf,
    staged: Option<PathBuf>,
}

impl StagedRemoval {
    /// Whether the file existed when the removal was staged.
    pub fn was_present(&self) -> bool {
        self.staged.is_some()
    }

    pub fn commit(self) -> Result<(), FilesError> {
        if let Some(staged) = &self.staged {
            match fs::remove_file(staged) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(io_context(
                        e,
                        format!("Failed to remove {}", staged.display()),
                    ))
                }
            }
        }
        Ok(())
    }

    pub fn rollback(self) -> Result<(), FilesError> {
        if let Some(staged) = &self.staged {
            fs::rename(staged, &self.original).map_err(|e| {
                io_context(
                    e,
                    format!("Failed to restore {}", self.original.display()),
                )
            })?;
        }
        Ok(())
    }
}

/// Service for the on-disk upload tree.
///
/// The store is cheap to clone and holds no open handles; it only knows the canonical root.
#[derive(Debug, Clone)]
pub struct UploadStore {
    /// Canonicalised upload root
    root_directory: PathBuf,
}

impl UploadStore {
    /// Opens an existing upload root.
    ///
    /// Missing folder directories are created; the root itself must already exist.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - The root directory does not exist or is not a directory
    /// - Path canonicalisation fails
    /// - A folder directory cannot be created (I/O)
    pub fn new(root_directory: &Path) -> Result<Self, FilesError> {
        if !root_directory.exists() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root_directory.display()
            )));
        }

        if !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let store = Self { root_directory };
        for folder in Folder::ALL {
            let dir = store.folder_directory(folder);
            fs::create_dir_all(&dir).map_err(|e| {
                io_context(
                    e,
                    format!("Failed to create folder directory {}", dir.display()),
                )
            })?;
        }

        Ok(store)
    }

    /// Creates the upload root if needed, then opens it.
    pub fn initialise(root_directory: &Path) -> Result<Self, FilesError> {
        fs::create_dir_all(root_directory).map_err(|e| {
            io_context(
                e,
                format!(
                    "Failed to create upload directory {}",
                    root_directory.display()
                ),
            )
        })?;
        Self::new(root_directory)
    }

    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    pub fn folder_directory(&self, folder: Folder) -> PathBuf {
        self.root_directory.join(folder.as_str())
    }

    pub fn file_path(&self, folder: Folder, filename: &SafeFilename) -> PathBuf {
        self.folder_directory(folder).join(filename.as_str())
    }

    /// Opens a temp file under the root for an incoming upload.
    pub fn stage(&self, filename: SafeFilename) -> Result<PendingUpload, FilesError> {
        let file = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&self.root_directory)
            .map_err(|e| {
                io_context(
                    e,
                    format!(
                        "Failed to create staging file in {}",
                        self.root_directory.display()
                    ),
                )
            })?;

        Ok(PendingUpload {
            filename,
            file,
            size: 0,
        })
    }

    /// Renames a sealed upload to `<root>/<folder>/<filename>`, replacing any existing file.
    pub fn place(&self, sealed: SealedUpload, folder: Folder) -> Result<StoredFile, FilesError> {
        let path = self.file_path(folder, &sealed.filename);
        sealed.file.persist(&path).map_err(|e| {
            io_context(e.error, format!("Failed to place upload at {}", path.display()))
        })?;

        tracing::debug!("placed {} ({} bytes)", path.display(), sealed.size);

        Ok(StoredFile {
            filename: sealed.filename,
            folder,
            path,
            size: sealed.size,
            digest: sealed.digest,
        })
    }

    /// Deletes a file from the tree. Returns `false` if it was already gone.
    pub fn remove(&self, folder: Folder, filename: &SafeFilename) -> Result<bool, FilesError> {
        let path = self.file_path(folder, filename);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_context(e, format!("Failed to remove {}", path.display()))),
        }
    }

    /// Moves a file aside ahead of deletion. A missing file is not an error; the returned
    /// removal then reports `was_present() == false` and commit/rollback are no-ops.
    pub fn stage_removal(
        &self,
        folder: Folder,
        filename: &SafeFilename,
    ) -> Result<StagedRemoval, FilesError> {
        let original = self.file_path(folder, filename);
        let staged = self
            .folder_directory(folder)
            .join(format!(".{}{}", filename, REMOVAL_SUFFIX));

        match fs::rename(&original, &staged) {
            Ok(()) => Ok(StagedRemoval {
                original,
                staged: Some(staged),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StagedRemoval {
                original,
                staged: None,
            }),
            Err(e) => Err(io_context(
                e,
                format!("Failed to stage removal of {}", original.display()),
            )),
        }
    }

    /// Lists regular files in every folder directory, sorted by folder then name.
    ///
    /// Hidden entries (staging and pending-removal files) and subdirectories are skipped.
    pub fn scan(&self) -> Result<Vec<DiskFile>, FilesError> {
        let mut found = Vec::new();

        for folder in Folder::ALL {
            let dir = self.folder_directory(folder);
            let entries = match fs::read_dir(&dir) {
                Ok(it) => it,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(io_context(e, format!("Failed to read {}", dir.display())))
                }
            };

            for entry in entries {
                let entry =
                    entry.map_err(|e| io_context(e, format!("Failed to read {}", dir.display())))?;
                let Some(filename) = entry.file_name().to_str().map(str::to_owned) else {
                    tracing::warn!("skipping non UTF-8 filename in {}", dir.display());
                    continue;
                };
                if filename.starts_with('.') {
                    continue;
                }
                let metadata = entry.metadata().map_err(|e| {
                    io_context(e, format!("Failed to stat {}", entry.path().display()))
                })?;
                if !metadata.is_file() {
                    continue;
                }
                found.push(DiskFile {
                    folder,
                    filename,
                    size: metadata.len(),
                });
            }
        }

        found.sort();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn name(s: &str) -> SafeFilename {
        SafeFilename::new(s).unwrap()
    }

    fn store_bytes(store: &UploadStore, folder: Folder, filename: &str, bytes: &[u8]) -> StoredFile {
        let mut pending = store.stage(name(filename)).unwrap();
        pending.write_chunk(bytes).unwrap();
        store.place(pending.seal().unwrap(), folder).unwrap()
    }

    #[test]
    fn test_new_root_not_exists() {
        let temp = TempDir::new().unwrap();
        let result = UploadStore::new(&temp.path().join("missing"));
        assert!(matches!(result, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_new_root_not_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("file.txt");
        fs::write(&root, "not a directory").unwrap();

        let result = UploadStore::new(&root);
        assert!(matches!(result, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_initialise_creates_folders() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("static").join("uploads");

        let store = UploadStore::initialise(&root).unwrap();

        for folder in Folder::ALL {
            assert!(store.folder_directory(folder).is_dir());
        }
        assert!(store.root_directory().is_absolute());
    }

    #[test]
    fn test_stage_and_place() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::initialise(temp.path()).unwrap();

        let mut pending = store.stage(name("a.bin")).unwrap();
        pending.write_chunk(b"hel").unwrap();
        pending.write_chunk(b"lo").unwrap();
        assert_eq!(pending.size(), 5);

        let sealed = pending.seal().unwrap();
        assert_eq!(sealed.digest().as_str(), HELLO);
        assert_eq!(sealed.size(), 5);

        let stored = store.place(sealed, Folder::Pack).unwrap();
        assert_eq!(stored.path, store.root_directory().join("pack").join("a.bin"));
        assert_eq!(fs::read(&stored.path).unwrap(), b"hello");
        assert_eq!(stored.digest.as_str(), HELLO);
    }

    #[test]
    fn test_place_overwrites_existing() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::initialise(temp.path()).unwrap();

        store_bytes(&store, Folder::Main, "a.bin", b"first");
        let stored = store_bytes(&store, Folder::Main, "a.bin", b"hello");

        assert_eq!(fs::read(&stored.path).unwrap(), b"hello");
        assert_eq!(stored.digest.as_str(), HELLO);
    }

    #[test]
    fn test_dropped_upload_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::initialise(temp.path()).unwrap();

        {
            let mut pending = store.stage(name("a.bin")).unwrap();
            pending.write_chunk(b"partial").unwrap();
        }

        let leftovers: Vec<_> = fs::read_dir(store.root_directory())
            .unwrap()
            .flatten()
            .filter(|e| e.file_type().unwrap().is_file())
            .collect();
        assert!(leftovers.is_empty());
        assert!(store.scan().unwrap().is_empty());
    }

    #[test]
    fn test_remove_tolerates_absence() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::initialise(temp.path()).unwrap();
        store_bytes(&store, Folder::Main, "a.bin", b"hello");

        assert!(store.remove(Folder::Main, &name("a.bin")).unwrap());
        assert!(!store.remove(Folder::Main, &name("a.bin")).unwrap());
        assert!(!store.file_path(Folder::Main, &name("a.bin")).exists());
    }

    #[test]
    fn test_staged_removal_commit() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::initialise(temp.path()).unwrap();
        let stored = store_bytes(&store, Folder::Custom, "a.bin", b"hello");

        let removal = store.stage_removal(Folder::Custom, &name("a.bin")).unwrap();
        assert!(removal.was_present());
        assert!(!stored.path.exists());
        assert!(store.scan().unwrap().is_empty());

        removal.commit().unwrap();
        let remaining: Vec<_> = fs::read_dir(store.folder_directory(Folder::Custom))
            .unwrap()
            .collect();
        assert!(remaining.is_empty());
    }

    #[test]
    fn test_staged_removal_rollback() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::initialise(temp.path()).unwrap();
        let stored = store_bytes(&store, Folder::Main, "a.bin", b"hello");

        let removal = store.stage_removal(Folder::Main, &name("a.bin")).unwrap();
        removal.rollback().unwrap();

        assert_eq!(fs::read(&stored.path).unwrap(), b"hello");
    }

    #[test]
    fn test_staged_removal_of_missing_file() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::initialise(temp.path()).unwrap();

        let removal = store.stage_removal(Folder::Main, &name("ghost.bin")).unwrap();
        assert!(!removal.was_present());
        removal.commit().unwrap();
    }

    #[test]
    fn test_scan_lists_folders_and_skips_hidden() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::initialise(temp.path()).unwrap();
        store_bytes(&store, Folder::Pack, "b.bin", b"bb");
        store_bytes(&store, Folder::Main, "a.bin", b"a");
        fs::write(store.folder_directory(Folder::Main).join(".hidden"), b"x").unwrap();
        fs::create_dir(store.folder_directory(Folder::Main).join("nested")).unwrap();

        let files = store.scan().unwrap();

        assert_eq!(
            files,
            vec![
                DiskFile {
                    folder: Folder::Main,
                    filename: "a.bin".into(),
                    size: 1
                },
                DiskFile {
                    folder: Folder::Pack,
                    filename: "b.bin".into(),
                    size: 2
                },
            ]
        );
    }
}
