//! Validated value types shared by the patchlist crates.
//!
//! Every value that crosses a trust boundary (an uploaded filename, a folder selector from a
//! form field, a status string from a JSON body, a digest read back from the ledger) is parsed
//! into one of these types once, at the edge. Code behind that edge can then rely on the
//! invariants without re-checking them.

mod filename;
mod folder;
mod hash;
mod status;

pub use filename::SafeFilename;
pub use folder::Folder;
pub use hash::Sha256Hash;
pub use status::FileStatus;

/// Errors that can occur when creating validated types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// The filename was empty once unsafe characters and path components were removed
    #[error("Filename is empty after sanitisation: {0:?}")]
    InvalidFilename(String),

    /// The folder selector is not one of the allowed upload folders
    #[error("Invalid folder: {0:?} (expected one of main, pack, custom)")]
    InvalidFolder(String),

    /// The status string is neither `ON` nor `OFF`
    #[error("Invalid status: {0:?} (expected ON or OFF)")]
    InvalidStatus(String),

    /// The digest is not 64 lowercase hexadecimal characters
    #[error("Invalid SHA-256 digest: {0:?}")]
    InvalidHash(String),
}
