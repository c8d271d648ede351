//! Integration tests for the processing worker pipeline: queue -> lock ->
//! processor -> version reconciliation, and the embedding sync worker that
//! trails behind it.
//!
//! These exercise the same collaborators `App` wires together in
//! `app.rs::bootstrap`, but construct them directly against a tempdir so each
//! test controls its own files and can assert on the index/archive
//! afterwards.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use vault_archive::ParquetChunkArchive;
use vault_chunker::ChunkOptions;
use vault_core::{FileProcessor, ProcessingTask};
use vault_daemon::embedding_worker::{self, EmbeddingSyncConfig};
use vault_daemon::processor::DefaultFileProcessor;
use vault_daemon::worker::{self, ProcessingWorkerConfig};
use vault_enrichment::{default_extractors, MockEmbeddingProvider};
use vault_index::{ChunkIndex, SqliteConfig, SqlitePool};
use vault_queue::{QueueManager, QueueManagerConfig};

fn build_processor(temp: &TempDir) -> (Arc<DefaultFileProcessor>, Arc<SqlitePool>) {
    let archive = Arc::new(ParquetChunkArchive::new(temp.path().join("archive")));
    let pool = Arc::new(SqlitePool::new(SqliteConfig::new(temp.path().join("index.sqlite3"))).unwrap());
    let embedder = Arc::new(MockEmbeddingProvider::new(16));
    let processor = Arc::new(DefaultFileProcessor::new(
        default_extractors(),
        embedder,
        archive,
        Arc::clone(&pool),
        ChunkOptions::default(),
    ));
    (processor, pool)
}

/// A file enqueued, dequeued, and processed ends up archived and indexed,
/// with the queue's version map reflecting the hash it was processed at.
#[tokio::test]
async fn enqueue_to_index_round_trip() {
    let temp = TempDir::new().unwrap();
    let (processor, pool) = build_processor(&temp);

    let source_path = temp.path().join("note.txt");
    tokio::fs::write(&source_path, "Sentence one. Sentence two. Sentence three.")
        .await
        .unwrap();
    let hash = vault_core::hash::file_hash(&tokio::fs::read(&source_path).await.unwrap());

    let queue = Arc::new(
        QueueManager::new(QueueManagerConfig {
            default_debounce_delay: Duration::from_millis(10),
            persist_dir: temp.path().join("queue"),
        })
        .unwrap(),
    );
    queue.start();

    queue.enqueue_change(ProcessingTask::new(
        "note.txt".to_string(),
        source_path.to_string_lossy().into_owned(),
        hash.clone(),
        false,
    ));

    let shutdown = queue.cancellation_token();
    let worker_handle = tokio::spawn(worker::run(
        Arc::clone(&queue),
        Arc::clone(&processor) as Arc<dyn FileProcessor>,
        ProcessingWorkerConfig { max_retries: 3 },
        shutdown.clone(),
    ));

    // Debounce delay is 10ms; give the worker a little headroom to drain it.
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.cancel();
    worker_handle.await.unwrap();

    assert_eq!(queue.get_version("note.txt"), Some(hash));

    let index = ChunkIndex::new(&pool);
    let source = index.get_source_file("note.txt").unwrap().expect("source row should exist");
    assert!(source.chunk_count > 0);
    assert!(source.archive_path.is_some());
}

/// Deleting a file that was previously indexed removes its chunks and clears
/// the version map entry, without touching the processor's source-file row
/// bookkeeping (deletion only clears chunks, per `process_deletion`).
#[tokio::test]
async fn deletion_clears_version_and_chunks() {
    let temp = TempDir::new().unwrap();
    let (processor, pool) = build_processor(&temp);

    let source_path = temp.path().join("note.txt");
    tokio::fs::write(&source_path, "Some content to chunk and index.").await.unwrap();
    let hash = vault_core::hash::file_hash(&tokio::fs::read(&source_path).await.unwrap());

    let queue = Arc::new(
        QueueManager::new(QueueManagerConfig {
            default_debounce_delay: Duration::from_millis(10),
            persist_dir: temp.path().join("queue"),
        })
        .unwrap(),
    );
    queue.start();
    queue.enqueue_change(ProcessingTask::new(
        "note.txt".to_string(),
        source_path.to_string_lossy().into_owned(),
        hash,
        false,
    ));

    let shutdown = queue.cancellation_token();
    let worker_handle = tokio::spawn(worker::run(
        Arc::clone(&queue),
        Arc::clone(&processor) as Arc<dyn FileProcessor>,
        ProcessingWorkerConfig { max_retries: 3 },
        shutdown.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(200)).await;

    queue.enqueue_direct(ProcessingTask::new(
        "note.txt".to_string(),
        source_path.to_string_lossy().into_owned(),
        String::new(),
        true,
    ));
    tokio::time::sleep(Duration::from_millis(100)).await;

    shutdown.cancel();
    worker_handle.await.unwrap();

    assert_eq!(queue.get_version("note.txt"), None);
    let index = ChunkIndex::new(&pool);
    assert_eq!(index.count_unembedded_for_source("note.txt").unwrap(), 0);
}

/// A task whose path has no extractor fails terminally and is never
/// retried: `ready_len`/`pending_len` stay at zero rather than growing.
#[tokio::test]
async fn unsupported_extension_does_not_retry() {
    let temp = TempDir::new().unwrap();
    let (processor, _pool) = build_processor(&temp);

    let source_path = temp.path().join("image.png");
    tokio::fs::write(&source_path, b"not really a png").await.unwrap();

    let queue = Arc::new(
        QueueManager::new(QueueManagerConfig {
            default_debounce_delay: Duration::from_millis(5),
            persist_dir: temp.path().join("queue"),
        })
        .unwrap(),
    );
    queue.start();
    queue.enqueue_change(ProcessingTask::new(
        "image.png".to_string(),
        source_path.to_string_lossy().into_owned(),
        "deadbeef".to_string(),
        false,
    ));

    let shutdown = queue.cancellation_token();
    let worker_handle = tokio::spawn(worker::run(
        Arc::clone(&queue),
        Arc::clone(&processor) as Arc<dyn FileProcessor>,
        ProcessingWorkerConfig { max_retries: 3 },
        shutdown.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(150)).await;
    shutdown.cancel();
    worker_handle.await.unwrap();

    assert_eq!(queue.ready_len(), 0);
    assert_eq!(queue.pending_len(), 0);
    assert_eq!(queue.get_version("image.png"), None);
}

/// The embedding sync worker picks up chunks the processing worker archived
/// and indexed, assigns them embeddings, and marks the source file synced.
#[tokio::test]
async fn embedding_worker_backfills_after_processing() {
    let temp = TempDir::new().unwrap();
    let (processor, pool) = build_processor(&temp);

    let source_path = temp.path().join("note.txt");
    tokio::fs::write(&source_path, "First sentence here. Second sentence follows along.")
        .await
        .unwrap();

    vault_core::FileProcessor::process(
        processor.as_ref(),
        "note.txt",
        &source_path.to_string_lossy(),
    )
    .await
    .unwrap();

    let embedder = Arc::new(MockEmbeddingProvider::new(16));
    let shutdown = CancellationToken::new();
    let embedding_handle = tokio::spawn(embedding_worker::run(
        Arc::clone(&pool),
        embedder,
        EmbeddingSyncConfig {
            tick_interval: Duration::from_millis(20),
            batch_size: 10,
        },
        shutdown.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(150)).await;
    shutdown.cancel();
    embedding_handle.await.unwrap();

    let index = ChunkIndex::new(&pool);
    assert_eq!(index.get_chunks_without_embedding(10).unwrap().len(), 0);
    let source = index.get_source_file("note.txt").unwrap().unwrap();
    assert!(source.is_synced);
}
