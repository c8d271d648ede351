use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive write failed: {0}")]
    Write(String),

    #[error("archive read failed: {0}")]
    Read(String),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

impl From<ArchiveError> for vault_core::VaultError {
    fn from(e: ArchiveError) -> Self {
        vault_core::VaultError::ArchiveWrite(e.to_string())
    }
}
