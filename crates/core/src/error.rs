use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid value: {0}")]
    InvalidValue(#[from] patchlist_types::TypesError),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("extension not allowed: {0}")]
    DisallowedExtension(String),

    #[error("failed to read ledger {path}: {source}", path = path.display())]
    LedgerRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("ledger {path} is malformed: {source}", path = path.display())]
    MalformedLedger {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize ledger: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to write {path}: {source}", path = path.display())]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("file storage error: {0}")]
    Files(#[from] patchlist_files::FilesError),

    #[error("blocking task failed: {0}")]
    Task(String),
}

impl PatchError {
    /// True for errors caused by the request rather than by server state.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PatchError::InvalidInput(_)
                | PatchError::InvalidValue(_)
                | PatchError::DisallowedExtension(_)
        )
    }
}

pub type PatchResult<T> = std::result::Result<T, PatchError>;
