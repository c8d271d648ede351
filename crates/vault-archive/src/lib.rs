//! Self-describing, compressed columnar chunk archive (C4): one Parquet
//! file per source, every row carrying its source metadata so the file is
//! interpretable without the relational index.

pub mod error;
mod reader;
mod schema;
mod writer;

pub use error::{ArchiveError, Result};
pub use schema::chunk_schema;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use vault_core::{Chunk, ChunkStorage};

/// Conventional extension for archive files; not required by the reader.
pub const ARCHIVE_EXTENSION: &str = "chunks.parquet";

/// `ChunkStorage` implementation backed by the Parquet writer/reader in
/// this crate. Write is atomic (temp file + rename); read tolerates
/// unknown extra columns.
pub struct ParquetChunkArchive {
    archive_dir: PathBuf,
}

impl ParquetChunkArchive {
    pub fn new(archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
        }
    }

    pub fn archive_path_for(&self, source_path: &str) -> PathBuf {
        let sanitized = source_path.replace(['/', '\\'], "_");
        self.archive_dir.join(format!("{sanitized}.{ARCHIVE_EXTENSION}"))
    }
}

#[async_trait]
impl ChunkStorage for ParquetChunkArchive {
    async fn write_chunks(&self, source_path: &str, chunks: &[Chunk]) -> vault_core::Result<String> {
        let target = self.archive_path_for(source_path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let chunks = chunks.to_vec();
        let target_clone = target.clone();
        tokio::task::spawn_blocking(move || writer::write_chunks(&chunks, &target_clone))
            .await
            .map_err(|e| vault_core::VaultError::ArchiveWrite(format!("writer task panicked: {e}")))?
            .map_err(vault_core::VaultError::from)?;
        Ok(target.to_string_lossy().into_owned())
    }

    async fn read_chunks(&self, archive_path: &str) -> vault_core::Result<Vec<Chunk>> {
        let path = Path::new(archive_path).to_path_buf();
        tokio::task::spawn_blocking(move || reader::read_chunks(&path))
            .await
            .map_err(|e| vault_core::VaultError::ArchiveWrite(format!("reader task panicked: {e}")))?
            .map_err(vault_core::VaultError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vault_core::SourceMetadata;

    fn sample_chunk(index: i32, text: &str) -> Chunk {
        Chunk::new(
            "src-1",
            index,
            text,
            Some(0),
            Some(text.len() as i32),
            None,
            None,
            "v1",
            SourceMetadata {
                source_name: "sample.txt".into(),
                source_content_type: Some("text/plain".into()),
                source_file_size: Some(1024),
                source_file_hash: Some("deadbeef".into()),
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn round_trips_chunks_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ParquetChunkArchive::new(dir.path());
        let chunks = vec![sample_chunk(0, "first chunk"), sample_chunk(1, "second chunk")];

        let path = archive.write_chunks("notes/a.md", &chunks).await.unwrap();
        let read_back = archive.read_chunks(&path).await.unwrap();

        assert_eq!(read_back.len(), chunks.len());
        for (original, read) in chunks.iter().zip(read_back.iter()) {
            assert_eq!(original.id, read.id);
            assert_eq!(original.text, read.text);
            assert_eq!(original.content_hash, read.content_hash);
            assert_eq!(original.start_index, read.start_index);
            assert_eq!(original.end_index, read.end_index);
            assert_eq!(original.metadata, read.metadata);
        }
    }

    #[tokio::test]
    async fn round_trips_null_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ParquetChunkArchive::new(dir.path());
        let mut chunk = sample_chunk(0, "no offsets here");
        chunk.start_index = None;
        chunk.end_index = None;
        chunk.page_number = None;
        chunk.source_location = None;

        let path = archive.write_chunks("notes/b.md", &[chunk.clone()]).await.unwrap();
        let read_back = archive.read_chunks(&path).await.unwrap();

        assert_eq!(read_back.len(), 1);
        assert_eq!(read_back[0].start_index, None);
        assert_eq!(read_back[0].page_number, None);
    }

    #[tokio::test]
    async fn write_is_atomic_no_partial_file_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ParquetChunkArchive::new(dir.path());
        let chunks = vec![sample_chunk(0, "chunk")];
        let path = archive.write_chunks("notes/c.md", &chunks).await.unwrap();

        let tmp_path = format!("{path}.tmp");
        assert!(!Path::new(&tmp_path).exists());
        assert!(Path::new(&path).exists());
    }
}
