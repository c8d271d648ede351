use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Raw watcher-facing event kind, one level below `vault_core::FileChangeKind`
/// (which additionally distinguishes `Copied`/`Renamed` for application-
/// originated notifications).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileEventKind {
    Created,
    Modified,
    Deleted,
    Moved { from: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEvent {
    pub kind: FileEventKind,
    pub path: PathBuf,
    pub is_directory: bool,
}

impl FileEvent {
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>, is_directory: bool) -> Self {
        Self {
            kind,
            path: path.into(),
            is_directory,
        }
    }
}
