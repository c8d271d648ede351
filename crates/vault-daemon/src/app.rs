use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use vault_archive::ParquetChunkArchive;
use vault_chunker::ChunkOptions;
use vault_config::VaultConfig;
use vault_core::{EmbeddingProvider, FileChangeEvent, FileChangeKind, ProcessingTask, TextExtractor};
use vault_index::{SqliteConfig, SqlitePool};
use vault_queue::{QueueManager, QueueManagerConfig};
use vault_watch::{FileChangeNotifier, WatchManager, WatchManagerConfig};

use crate::embedding_worker::{self, EmbeddingSyncConfig};
use crate::processor::DefaultFileProcessor;
use crate::webdav::{self, WebdavState};
use crate::worker::{self, ProcessingWorkerConfig};

/// Bundles every long-lived collaborator built from one `VaultConfig`. A
/// single instance backs both the one-shot `file`/`dir` CLI subcommands and
/// the long-running `serve` subcommand.
pub struct App {
    pub config: VaultConfig,
    pub notifier: Arc<FileChangeNotifier>,
    pub queue: Arc<QueueManager>,
    pub processor: Arc<DefaultFileProcessor>,
    pub index_pool: Arc<SqlitePool>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl App {
    pub fn bootstrap(config: VaultConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_path)?;
        let archive_dir = config.data_path.join("archive");
        let index_path = config.data_path.join("index.sqlite3");
        let persist_dir = config.data_path.join("queue");
        std::fs::create_dir_all(&persist_dir)?;

        let embedder: Arc<dyn EmbeddingProvider> = build_embedder(&config)?;
        let extractors: Vec<Box<dyn TextExtractor>> = vault_enrichment::default_extractors();
        let archive = Arc::new(ParquetChunkArchive::new(archive_dir));
        let index_pool = Arc::new(SqlitePool::new(SqliteConfig::new(index_path))?);

        let chunk_options = ChunkOptions {
            similarity_threshold: config.chunking.similarity_threshold,
            min_chunk_size: config.chunking.min_chunk_size,
            max_chunk_size: config.chunking.max_chunk_size,
            delimiters: config.chunking.delimiters.clone(),
        };

        let processor = Arc::new(DefaultFileProcessor::new(
            extractors,
            Arc::clone(&embedder),
            archive,
            Arc::clone(&index_pool),
            chunk_options,
        ));

        let queue = Arc::new(QueueManager::new(QueueManagerConfig {
            default_debounce_delay: Duration::from_millis(config.debounce_delay_ms),
            persist_dir,
        })?);

        let notifier = FileChangeNotifier::new();

        Ok(Self {
            config,
            notifier,
            queue,
            processor,
            index_pool,
            embedder,
        })
    }

    /// Runs C1-C5 for a single file, bypassing the queue entirely (used by
    /// the `file` CLI subcommand, which wants synchronous pass/fail per path).
    pub async fn ingest_file(&self, path: &Path) -> anyhow::Result<()> {
        let relative_path = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let result = vault_core::FileProcessor::process(
            self.processor.as_ref(),
            &relative_path,
            &path.to_string_lossy(),
        )
        .await?;
        info!(path = %relative_path, chunks = result.chunk_count, "ingested file");
        Ok(())
    }

    /// Walks `root` (optionally recursive, optionally filtered by a glob
    /// pattern) and ingests every matching file in turn.
    pub async fn ingest_dir(&self, root: &Path, recursive: bool, pattern: Option<&str>) -> anyhow::Result<usize> {
        let matcher = pattern.map(globset::Glob::new).transpose()?.map(|g| g.compile_matcher());

        let mut paths = Vec::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_dir() {
                    if recursive {
                        stack.push(path);
                    }
                    continue;
                }

                if let Some(matcher) = &matcher {
                    if !matcher.is_match(&path) {
                        continue;
                    }
                }

                paths.push(path);
            }
        }

        let concurrency = num_cpus::get().max(1);
        let failures = std::sync::atomic::AtomicUsize::new(0);
        let succeeded = std::sync::atomic::AtomicUsize::new(0);

        futures::stream::iter(paths)
            .for_each_concurrent(concurrency, |path| async {
                match self.ingest_file(&path).await {
                    Ok(()) => {
                        succeeded.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    }
                    Err(e) => {
                        failures.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                        error!(path = %path.display(), error = %e, "ingestion failed");
                    }
                }
            })
            .await;

        let count = succeeded.load(std::sync::atomic::Ordering::SeqCst);
        let failures = failures.load(std::sync::atomic::Ordering::SeqCst);
        if failures > 0 {
            anyhow::bail!("{failures} file(s) failed to ingest ({count} succeeded)");
        }

        Ok(count)
    }

    /// Runs the full daemon: watcher, notifier pruning timer, queue timers,
    /// processing worker, embedding sync worker, and the WebDAV front end,
    /// all sharing `queue.cancellation_token()` for coordinated shutdown.
    pub async fn serve(&self) -> anyhow::Result<()> {
        let shutdown = self.queue.cancellation_token();

        self.queue.start();

        let pruning_handle = vault_watch::spawn_pruning_timer(Arc::clone(&self.notifier));

        let mut watch_manager = WatchManager::new(WatchManagerConfig::default()).await?;
        watch_manager
            .register_handler(Arc::clone(&self.notifier) as Arc<dyn vault_watch::EventHandler>)
            .await?;
        watch_manager.start().await?;
        watch_manager
            .add_watch(
                self.config.data_path.clone(),
                vault_watch::WatchConfig::new("vault").with_recursive(true),
            )
            .await?;

        let bridge_handle = spawn_notifier_to_queue_bridge(
            Arc::clone(&self.notifier),
            Arc::clone(&self.queue),
            shutdown.clone(),
        );

        let worker_handle = tokio::spawn(worker::run(
            Arc::clone(&self.queue),
            Arc::clone(&self.processor) as Arc<dyn vault_core::FileProcessor>,
            ProcessingWorkerConfig {
                max_retries: self.config.max_retries,
            },
            shutdown.clone(),
        ));

        let embedding_handle = tokio::spawn(embedding_worker::run(
            Arc::clone(&self.index_pool),
            Arc::clone(&self.embedder),
            EmbeddingSyncConfig {
                tick_interval: Duration::from_secs(self.config.embedding_sync_interval_secs),
                batch_size: self.config.embedding_batch_size,
            },
            shutdown.clone(),
        ));

        let webdav_state = Arc::new(WebdavState {
            vault_root: self.config.data_path.clone(),
            notifier: Arc::clone(&self.notifier),
        });
        let router = webdav::router(webdav_state);
        let listener = tokio::net::TcpListener::bind(&self.config.webdav_bind_addr).await?;
        info!(addr = %self.config.webdav_bind_addr, "webdav front end listening");

        let server_shutdown = shutdown.clone();
        let server = axum::serve(listener, router).with_graceful_shutdown(async move {
            server_shutdown.cancelled().await;
            info!("webdav front end shutting down");
        });
        let server_handle = tokio::spawn(server);

        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c, shutting down");
                shutdown.cancel();
            }
        }

        if let Ok(Err(e)) = server_handle.await {
            warn!(error = %e, "webdav server exited with error");
        }
        pruning_handle.abort();
        bridge_handle.abort();
        let _ = worker_handle.await;
        let _ = embedding_handle.await;
        watch_manager.shutdown().await?;
        self.queue.shutdown()?;

        Ok(())
    }
}

fn build_embedder(config: &VaultConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    #[cfg(feature = "onnx")]
    {
        if let (Some(model_path), Some(tokenizer_path)) = (&config.onnx_model_path, &config.onnx_tokenizer_path) {
            let provider = vault_enrichment::OnnxEmbeddingProvider::load(
                model_path,
                tokenizer_path,
                config.embedding_dimension,
                "vaultkeep-onnx",
            )?;
            return Ok(Arc::new(provider));
        }
        warn!("no onnx model/tokenizer path configured, falling back to the mock embedding provider");
    }

    Ok(Arc::new(vault_enrichment::MockEmbeddingProvider::new(config.embedding_dimension)))
}

/// Consumes the notifier's lossy event stream and turns each `FileChangeEvent`
/// into a debounced `ProcessingTask`, the C6 → C7 handoff described for the
/// queue manager.
pub fn spawn_notifier_to_queue_bridge(
    notifier: Arc<FileChangeNotifier>,
    queue: Arc<QueueManager>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let receiver = notifier.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = receiver.recv_async() => {
                    match event {
                        Ok(event) => handle_change_event(&queue, event).await,
                        Err(_) => break,
                    }
                }
            }
        }
    })
}

async fn handle_change_event(queue: &Arc<QueueManager>, event: FileChangeEvent) {
    if event.is_directory {
        return;
    }

    if matches!(event.kind, FileChangeKind::Deleted) {
        queue.enqueue_change(ProcessingTask::new(
            event.relative_path,
            event.physical_path,
            String::new(),
            true,
        ));
        return;
    }

    let bytes = match tokio::fs::read(&event.physical_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %event.physical_path, error = %e, "could not read changed file, skipping");
            return;
        }
    };

    let hash = vault_core::hash::file_hash(&bytes);
    queue.enqueue_change(ProcessingTask::new(event.relative_path, event.physical_path, hash, false));
}
