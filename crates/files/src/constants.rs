//! Filesystem constants for the upload tree.

/// Read size used when hashing. Memory use while hashing is bounded by this, not by file size.
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Prefix of in-flight upload temp files, created directly under the upload root.
pub const STAGING_PREFIX: &str = ".upload-";

/// Suffix given to a file while its deletion is pending a ledger commit.
pub const REMOVAL_SUFFIX: &str = ".deleting";
