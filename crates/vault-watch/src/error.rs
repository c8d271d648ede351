use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error("watch manager is not running")]
    NotRunning,

    #[error("handler {0} failed: {1}")]
    Handler(String, String),
}

pub type Result<T> = std::result::Result<T, WatchError>;

impl From<WatchError> for vault_core::VaultError {
    fn from(e: WatchError) -> Self {
        vault_core::VaultError::WatcherOverflow(e.to_string())
    }
}
