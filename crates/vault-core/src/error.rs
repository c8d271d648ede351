use thiserror::Error;

/// Error taxonomy shared by every vaultkeep crate.
///
/// Variants map directly onto the propagation policy: `InputNotFound` and
/// `UnsupportedType` are terminal for a task, the transient variants
/// (`Extraction`, `Embedding`, `ArchiveWrite`, `Index`) carry a task back to
/// the queue for retry, and `VersionMismatch`/`WatcherOverflow`/`Cancelled`
/// are control-flow signals rather than failures.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("input not found: {0}")]
    InputNotFound(String),

    #[error("unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("embedding generation failed: {0}")]
    Embedding(String),

    #[error("archive write failed: {0}")]
    ArchiveWrite(String),

    #[error("index operation failed: {0}")]
    Index(String),

    /// Not a failure: the physical file changed again during processing.
    #[error("version mismatch for {path}: expected {expected}, found {found}")]
    VersionMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("watcher overflow: {0}")]
    WatcherOverflow(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;

impl VaultError {
    /// True for the variants the worker should requeue with an incremented
    /// retry count rather than treat as final.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            VaultError::Extraction(_)
                | VaultError::Embedding(_)
                | VaultError::ArchiveWrite(_)
                | VaultError::Index(_)
                | VaultError::Io(_)
        )
    }
}
