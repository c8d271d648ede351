use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("embedding byte length {found} does not match expected {expected} for dimension D")]
    EmbeddingLength { found: usize, expected: usize },

    #[error("poisoned connection lock")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl From<IndexError> for vault_core::VaultError {
    fn from(e: IndexError) -> Self {
        vault_core::VaultError::Index(e.to_string())
    }
}
