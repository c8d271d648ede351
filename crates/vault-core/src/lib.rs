//! Shared domain types, trait contracts, and error taxonomy for the
//! vaultkeep document ingestion pipeline.

pub mod error;
pub mod hash;
pub mod traits;
pub mod types;

pub use error::{Result, VaultError};
pub use traits::{ChangeObserver, ChunkStorage, EmbeddingProvider, FileProcessor, TextExtraction, TextExtractor};
pub use types::{
    ChangeOrigin, Chunk, EmbeddingRow, FileChangeEvent, FileChangeKind, ProcessingResult,
    ProcessingTask, Sentence, SourceFile, SourceMetadata, SourceStatus, VersionMap,
};
