//! Patchlist file storage
//!
//! This crate owns the bytes: the upload tree on disk and the content digests computed over it.
//! It knows nothing about the status ledger or the patchlist; those live in `patchlist-core`,
//! which decides *when* bytes are placed or removed.
//!
//! ## Upload tree
//!
//! ```text
//! <upload_root>/
//! ├── .upload-XXXXXX        # in-flight uploads (temp files, removed on drop)
//! ├── main/
//! │   └── a.bin
//! ├── pack/
//! │   └── data.grf
//! └── custom/
//! ```
//!
//! In-flight uploads are staged directly under the root so the target folder can be chosen
//! after the bytes have arrived. Because the staging file and the destination share a
//! filesystem, placing a file is a single `rename`: readers see either the old file or the new
//! one, never a partial write.
//!
//! ## Example Usage
//!
//! ```no_run
//! use patchlist_files::UploadStore;
//! use patchlist_types::{Folder, SafeFilename};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = UploadStore::initialise(Path::new("static/uploads"))?;
//!
//! let mut pending = store.stage(SafeFilename::new("a.bin")?)?;
//! pending.write_chunk(b"hello")?;
//! let stored = store.place(pending.seal()?, Folder::Main)?;
//! println!("{} {}", stored.path.display(), stored.digest);
//! # Ok(())
//! # }
//! ```

mod constants;
mod files;
mod hasher;

pub use constants::{HASH_CHUNK_SIZE, REMOVAL_SUFFIX, STAGING_PREFIX};
pub use files::{DiskFile, PendingUpload, SealedUpload, StagedRemoval, StoredFile, UploadStore};
pub use hasher::{hash_file, hash_reader};

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wraps an I/O error with a message naming the operation and path, keeping its kind.
pub(crate) fn io_context(e: std::io::Error, message: String) -> FilesError {
    FilesError::Io(std::io::Error::new(e.kind(), format!("{}: {}", message, e)))
}
