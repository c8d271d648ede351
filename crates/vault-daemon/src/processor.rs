use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use vault_chunker::ChunkOptions;
use vault_core::{
    hash, ChunkStorage, EmbeddingProvider, FileProcessor, ProcessingResult, Result as VaultResult,
    SourceFile, SourceMetadata, SourceStatus, TextExtractor, VaultError,
};
use vault_index::{ChunkIndex, SqlitePool};

/// Drives C1 (extraction) + C3 (chunking) + C4 (archive write) + C5 (index
/// upsert) for one task. The worker owns retry/requeue decisions; this type
/// only reports what happened for a single attempt.
pub struct DefaultFileProcessor {
    extractors: Vec<Box<dyn TextExtractor>>,
    embedder: Arc<dyn EmbeddingProvider>,
    archive: Arc<dyn ChunkStorage>,
    index_pool: Arc<SqlitePool>,
    chunk_options: ChunkOptions,
}

impl DefaultFileProcessor {
    pub fn new(
        extractors: Vec<Box<dyn TextExtractor>>,
        embedder: Arc<dyn EmbeddingProvider>,
        archive: Arc<dyn ChunkStorage>,
        index_pool: Arc<SqlitePool>,
        chunk_options: ChunkOptions,
    ) -> Self {
        Self {
            extractors,
            embedder,
            archive,
            index_pool,
            chunk_options,
        }
    }

    fn extractor_for(&self, ext: &str) -> VaultResult<&dyn TextExtractor> {
        self.extractors
            .iter()
            .find(|e| e.supports(ext))
            .map(|b| b.as_ref())
            .ok_or_else(|| VaultError::UnsupportedType(ext.to_string()))
    }
}

#[async_trait]
impl FileProcessor for DefaultFileProcessor {
    async fn process(&self, relative_path: &str, physical_path: &str) -> VaultResult<ProcessingResult> {
        let start = Instant::now();
        let path = Path::new(physical_path);

        if !path.exists() {
            return Err(VaultError::InputNotFound(physical_path.to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        let extractor = self.extractor_for(&ext)?;

        let bytes = tokio::fs::read(path).await?;
        let file_hash = hash::file_hash(&bytes);
        let file_size = bytes.len() as i64;
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| relative_path.to_string());

        let extractions = extractor.extract_path(path).await?;

        let mut all_chunks = Vec::new();
        let mut next_index: i32 = 0;
        let mut last_metadata = None;

        for extraction in &extractions {
            let metadata = SourceMetadata {
                source_name: source_name.clone(),
                source_content_type: Some(extraction.content_type.clone()),
                source_file_size: Some(file_size),
                source_file_hash: Some(file_hash.clone()),
            };

            let mut chunks = vault_chunker::chunk_text(
                &extraction.text,
                relative_path,
                metadata.clone(),
                &file_hash,
                self.embedder.as_ref(),
                &self.chunk_options,
            )
            .await
            .map_err(|e| VaultError::Embedding(e.to_string()))?;

            for chunk in &mut chunks {
                chunk.chunk_index = next_index;
                next_index += 1;
                if extraction.page_number.is_some() {
                    chunk.page_number = extraction.page_number;
                }
                if extraction.source_location.is_some() {
                    chunk.source_location = extraction.source_location.clone();
                }
            }

            last_metadata = Some(metadata);
            all_chunks.extend(chunks);
        }

        let archive_path = self.archive.write_chunks(relative_path, &all_chunks).await?;

        let pool = Arc::clone(&self.index_pool);
        let chunk_count = all_chunks.len() as i64;
        let relative_path_owned = relative_path.to_string();
        let archive_path_owned = archive_path.clone();
        let file_hash_owned = file_hash.clone();
        let chunks_owned = all_chunks.clone();

        tokio::task::spawn_blocking(move || -> VaultResult<()> {
            let index = ChunkIndex::new(&pool);
            index
                .delete_chunks_by_source_path(&relative_path_owned)
                .map_err(VaultError::from)?;
            index.insert_chunks(&chunks_owned).map_err(VaultError::from)?;
            index
                .upsert_source_file(&SourceFile {
                    path: relative_path_owned,
                    hash: file_hash_owned,
                    file_size,
                    chunk_count,
                    archive_path: Some(archive_path_owned),
                    status: SourceStatus::Completed,
                    processed_at: Some(Utc::now()),
                    is_synced: chunk_count == 0,
                })
                .map_err(VaultError::from)
        })
        .await
        .map_err(|e| VaultError::Index(format!("index task panicked: {e}")))??;

        Ok(ProcessingResult {
            success: true,
            output_path: Some(archive_path),
            chunk_count: all_chunks.len(),
            metadata: last_metadata,
            error_message: None,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn process_deletion(&self, relative_path: &str) -> VaultResult<()> {
        let pool = Arc::clone(&self.index_pool);
        let relative_path_owned = relative_path.to_string();
        tokio::task::spawn_blocking(move || -> VaultResult<()> {
            let index = ChunkIndex::new(&pool);
            index.delete_source_file(&relative_path_owned).map_err(VaultError::from)
        })
        .await
        .map_err(|e| VaultError::Index(format!("index task panicked: {e}")))?
    }
}
