use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Chunk, FileChangeEvent, ProcessingResult};

/// One capability contract per extension point (§9 design notes): no
/// inheritance hierarchy beyond this single level.
/// Produces a lazy sequence of `(text, content_type, page?, location?)`
/// records from a file path or an in-memory byte stream.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Whether this extractor can handle a file with the given extension
    /// (without the leading dot, lower-case).
    fn supports(&self, ext: &str) -> bool;

    async fn extract_path(&self, path: &std::path::Path) -> Result<Vec<TextExtraction>>;

    async fn extract_bytes(&self, bytes: &[u8], content_type: &str) -> Result<Vec<TextExtraction>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextExtraction {
    pub text: String,
    pub content_type: String,
    pub page_number: Option<i32>,
    pub source_location: Option<String>,
}

/// Maps one or many strings to L2-normalized float vectors of a fixed
/// dimension. The reference implementation runs an ONNX transformer; a
/// deterministic mock exists for tests.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;
}

/// Persists and retrieves chunk lists. Implemented by `vault-archive` (the
/// columnar file) and composed with `vault-index` by higher-level code; kept
/// as a narrow trait so C8 can be driven against a mock in tests.
#[async_trait]
pub trait ChunkStorage: Send + Sync {
    async fn write_chunks(&self, source_path: &str, chunks: &[Chunk]) -> Result<String>;

    async fn read_chunks(&self, archive_path: &str) -> Result<Vec<Chunk>>;
}

/// Drives extraction, chunking, archiving, and indexing for one task, and
/// handles deletions. Implemented by the worker in `vault-daemon`; the
/// trait exists so C7/C8's control flow can be tested against a fake.
#[async_trait]
pub trait FileProcessor: Send + Sync {
    async fn process(&self, relative_path: &str, physical_path: &str) -> Result<ProcessingResult>;

    async fn process_deletion(&self, relative_path: &str) -> Result<()>;
}

/// Observer callback registered with the file-change notifier (C6).
/// Mirrors the synchronous-observer fan-out described for the notifier.
#[async_trait]
pub trait ChangeObserver: Send + Sync {
    async fn on_change(&self, event: &FileChangeEvent);
}
