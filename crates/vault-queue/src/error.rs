use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("version map io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("version map is corrupt: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("queue is shutting down")]
    ShuttingDown,
}

pub type Result<T> = std::result::Result<T, QueueError>;

impl From<QueueError> for vault_core::VaultError {
    fn from(e: QueueError) -> Self {
        vault_core::VaultError::Other(e.to_string())
    }
}
