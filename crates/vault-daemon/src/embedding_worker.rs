use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;
use vault_core::EmbeddingProvider;
use vault_index::{ChunkIndex, SqlitePool};

pub struct EmbeddingSyncConfig {
    pub tick_interval: Duration,
    pub batch_size: usize,
}

impl Default for EmbeddingSyncConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(30),
            batch_size: 50,
        }
    }
}

/// Runs C9: each tick, pulls unembedded chunks, generates embeddings
/// (batched with per-chunk fallback on batch failure), persists them, and
/// marks sources synced once every one of their chunks has an embedding.
pub async fn run(
    pool: Arc<SqlitePool>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: EmbeddingSyncConfig,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(config.tick_interval) => {}
        }

        if let Err(e) = run_once(&pool, embedder.as_ref(), config.batch_size).await {
            error!(error = %e, "embedding sync tick failed, backing off");
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_secs(10)) => {}
            }
        }
    }

    tracing::info!("embedding sync worker stopped");
}

async fn run_once(
    pool: &Arc<SqlitePool>,
    embedder: &dyn EmbeddingProvider,
    batch_size: usize,
) -> anyhow::Result<()> {
    let pool_clone = Arc::clone(pool);
    let chunks = tokio::task::spawn_blocking(move || {
        let index = ChunkIndex::new(&pool_clone);
        index.get_chunks_without_embedding(batch_size)
    })
    .await??;

    if chunks.is_empty() {
        return Ok(());
    }

    let pairs = embed_with_fallback(embedder, &chunks).await;

    if !pairs.is_empty() {
        let pool_clone = Arc::clone(pool);
        let pairs_clone = pairs.clone();
        tokio::task::spawn_blocking(move || {
            let index = ChunkIndex::new(&pool_clone);
            index.save_embeddings_batch(&pairs_clone)
        })
        .await??;
    }

    let pool_clone = Arc::clone(pool);
    let unsynced = tokio::task::spawn_blocking(move || {
        let index = ChunkIndex::new(&pool_clone);
        index.get_unsynced_source_files(batch_size)
    })
    .await??;

    for source_path in unsynced {
        let pool_clone = Arc::clone(pool);
        let source_path_clone = source_path.clone();
        let remaining = tokio::task::spawn_blocking(move || {
            let index = ChunkIndex::new(&pool_clone);
            index.count_unembedded_for_source(&source_path_clone)
        })
        .await??;

        if remaining == 0 {
            let pool_clone = Arc::clone(pool);
            let source_path_clone = source_path.clone();
            tokio::task::spawn_blocking(move || {
                let index = ChunkIndex::new(&pool_clone);
                index.mark_source_file_as_synced(&source_path_clone)
            })
            .await??;
            debug!(path = %source_path, "source fully embedded, marked synced");
        }
    }

    Ok(())
}

async fn embed_with_fallback(
    embedder: &dyn EmbeddingProvider,
    chunks: &[(Uuid, String)],
) -> Vec<(Uuid, Vec<f32>)> {
    let texts: Vec<String> = chunks.iter().map(|(_, text)| text.clone()).collect();

    match embedder.embed_batch(&texts).await {
        Ok(embeddings) if embeddings.len() == chunks.len() => chunks
            .iter()
            .zip(embeddings)
            .map(|((id, _), embedding)| (*id, embedding))
            .collect(),
        Ok(_) => {
            warn!("embedding batch returned a mismatched count, falling back per-chunk");
            embed_per_chunk(embedder, chunks).await
        }
        Err(e) => {
            warn!(error = %e, "embedding batch failed, falling back per-chunk");
            embed_per_chunk(embedder, chunks).await
        }
    }
}

async fn embed_per_chunk(
    embedder: &dyn EmbeddingProvider,
    chunks: &[(Uuid, String)],
) -> Vec<(Uuid, Vec<f32>)> {
    let mut pairs = Vec::with_capacity(chunks.len());
    for (id, text) in chunks {
        match embedder.embed(text).await {
            Ok(embedding) => pairs.push((*id, embedding)),
            Err(e) => warn!(chunk_id = %id, error = %e, "embedding failed for chunk, skipping"),
        }
    }
    pairs
}
