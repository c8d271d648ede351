use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::{content_hash, deterministic_chunk_id};

/// A transient sentence produced by the chunker's sentence splitter.
/// Never persisted — internal to `vault-chunker`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub text: String,
    pub start_index: usize,
    pub end_index: usize,
    pub embedding: Option<Vec<f32>>,
}

impl Sentence {
    pub fn new(text: impl Into<String>, start_index: usize, end_index: usize) -> Self {
        Self {
            text: text.into(),
            start_index,
            end_index,
            embedding: None,
        }
    }
}

/// Lifecycle status of a `SourceFile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceStatus::Pending => "Pending",
            SourceStatus::Processing => "Processing",
            SourceStatus::Completed => "Completed",
            SourceStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Source-level metadata denormalized into every `Chunk` row so that an
/// archive file is interpretable without the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub source_name: String,
    pub source_content_type: Option<String>,
    pub source_file_size: Option<i64>,
    pub source_file_hash: Option<String>,
}

/// A persisted, retrieval-sized unit of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub content_hash: String,
    pub source_id: String,
    pub chunk_index: i32,
    pub text: String,
    pub start_index: Option<i32>,
    pub end_index: Option<i32>,
    pub page_number: Option<i32>,
    pub source_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub version: String,
    pub metadata: SourceMetadata,
}

impl Chunk {
    /// Construct a chunk, deriving `content_hash` and `id` from `source_id`
    /// and `text` per the deterministic-id contract.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_id: impl Into<String>,
        chunk_index: i32,
        text: impl Into<String>,
        start_index: Option<i32>,
        end_index: Option<i32>,
        page_number: Option<i32>,
        source_location: Option<String>,
        version: impl Into<String>,
        metadata: SourceMetadata,
        created_at: DateTime<Utc>,
    ) -> Self {
        let source_id = source_id.into();
        let text = text.into();
        let hash = content_hash(&text);
        let id = deterministic_chunk_id(&source_id, &hash);
        Self {
            id,
            content_hash: hash,
            source_id,
            chunk_index,
            text,
            start_index,
            end_index,
            page_number,
            source_location,
            created_at,
            version: version.into(),
            metadata,
        }
    }
}

/// A row of the `source_files` relational table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub hash: String,
    pub file_size: i64,
    pub chunk_count: i64,
    pub archive_path: Option<String>,
    pub status: SourceStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub is_synced: bool,
}

/// An embedding vector attached to a chunk by the sync worker.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRow {
    pub chunk_id: Uuid,
    pub embedding: Vec<f32>,
}

/// One unit of work carried through the queue manager and worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingTask {
    pub relative_path: String,
    pub physical_path: String,
    pub file_hash: String,
    pub created_at: DateTime<Utc>,
    pub retry_count: u32,
    pub is_deletion: bool,
}

impl ProcessingTask {
    pub fn new(
        relative_path: impl Into<String>,
        physical_path: impl Into<String>,
        file_hash: impl Into<String>,
        is_deletion: bool,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            physical_path: physical_path.into(),
            file_hash: file_hash.into(),
            created_at: Utc::now(),
            retry_count: 0,
            is_deletion,
        }
    }
}

/// The kind of filesystem mutation a `FileChangeEvent` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileChangeKind {
    Created,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Moved,
}

/// Where a `FileChangeEvent` originated — used by the notifier's echo
/// suppression rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOrigin {
    WebDav,
    FileSystem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChangeEvent {
    pub kind: FileChangeKind,
    pub origin: ChangeOrigin,
    pub relative_path: String,
    pub physical_path: String,
    pub is_directory: bool,
    pub old_relative_path: Option<String>,
    pub old_physical_path: Option<String>,
    pub timestamp_utc: DateTime<Utc>,
}

/// Persistent, atomic-rewrite mapping from relative path to the content hash
/// of the last successfully processed revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionMap(pub HashMap<String, String>);

impl VersionMap {
    pub fn get(&self, path: &str) -> Option<&String> {
        self.0.get(path)
    }

    pub fn set(&mut self, path: impl Into<String>, hash: impl Into<String>) {
        self.0.insert(path.into(), hash.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.0.remove(path)
    }
}

/// The structured per-file result surfaced to CLI and WebDAV collaborators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub output_path: Option<String>,
    pub chunk_count: usize,
    pub metadata: Option<SourceMetadata>,
    pub error_message: Option<String>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_new_derives_content_hash_and_id() {
        let c1 = Chunk::new(
            "src-1",
            0,
            "hello world",
            Some(0),
            Some(11),
            None,
            None,
            "v1",
            SourceMetadata::default(),
            Utc::now(),
        );
        let c2 = Chunk::new(
            "src-1",
            5,
            "hello world",
            Some(100),
            Some(111),
            None,
            None,
            "v2",
            SourceMetadata::default(),
            Utc::now(),
        );
        assert_eq!(c1.content_hash, c2.content_hash);
        assert_eq!(c1.id, c2.id, "id depends only on source_id + content_hash");
    }

    #[test]
    fn version_map_roundtrips_through_json() {
        let mut vm = VersionMap::default();
        vm.set("a.txt", "deadbeef");
        let json = serde_json::to_string(&vm).unwrap();
        let back: VersionMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("a.txt"), Some(&"deadbeef".to_string()));
    }
}
