use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("embedding service failed: {0}")]
    Embedding(#[from] vault_core::VaultError),
}

pub type Result<T> = std::result::Result<T, ChunkerError>;
