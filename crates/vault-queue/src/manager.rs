use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use vault_core::{ProcessingTask, VersionMap};

use crate::error::Result;
use crate::version_store::VersionStore;

const DEBOUNCE_TICK: Duration = Duration::from_millis(100);
const PERSIST_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct QueueManagerConfig {
    pub default_debounce_delay: Duration,
    pub persist_dir: std::path::PathBuf,
}

/// Releases a path's binary lock on drop.
pub type LockGuard = scopeguard::ScopeGuard<Arc<Semaphore>, fn(Arc<Semaphore>)>;

struct QueueManagerInner {
    pending: DashMap<String, (ProcessingTask, DateTime<Utc>, Duration)>,
    ready_tx: flume::Sender<ProcessingTask>,
    ready_rx: flume::Receiver<ProcessingTask>,
    locks: DashMap<String, Arc<Semaphore>>,
    versions: parking_lot::Mutex<VersionMap>,
    version_store: VersionStore,
}

/// Holds the four process-local structures driving C8: the debounce pending
/// map, the ready FIFO, the per-path lock table, and the persisted version
/// map.
pub struct QueueManager {
    inner: Arc<QueueManagerInner>,
    config: QueueManagerConfig,
    shutdown: CancellationToken,
    running: AtomicBool,
}

impl QueueManager {
    pub fn new(config: QueueManagerConfig) -> Result<Self> {
        let version_store = VersionStore::new(config.persist_dir.clone());
        let versions = version_store.load()?;
        let (ready_tx, ready_rx) = flume::unbounded();

        let inner = Arc::new(QueueManagerInner {
            pending: DashMap::new(),
            ready_tx,
            ready_rx,
            locks: DashMap::new(),
            versions: parking_lot::Mutex::new(versions),
            version_store,
        });

        Ok(Self {
            inner,
            config,
            shutdown: CancellationToken::new(),
            running: AtomicBool::new(false),
        })
    }

    /// Starts the 100ms debounce timer and the 30s version-map persistence
    /// timer. Both stop when `shutdown()` is called.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let debounce_inner = Arc::clone(&self.inner);
        let debounce_shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(DEBOUNCE_TICK);
            loop {
                tokio::select! {
                    _ = debounce_shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        promote_elapsed(&debounce_inner);
                    }
                }
            }
        });

        let persist_inner = Arc::clone(&self.inner);
        let persist_shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PERSIST_INTERVAL);
            loop {
                tokio::select! {
                    _ = persist_shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(e) = persist(&persist_inner) {
                            tracing::warn!(error = %e, "failed to persist version map");
                        }
                    }
                }
            }
        });
    }

    /// Stops the timers and persists the version map one final time.
    pub fn shutdown(&self) -> Result<()> {
        self.shutdown.cancel();
        self.running.store(false, Ordering::SeqCst);
        persist(&self.inner)
    }

    /// Upserts the pending-map entry for `task.relative_path`, resetting the
    /// debounce timer. A new change on the same path overwrites the prior
    /// entry entirely (the newest hash wins once the timer elapses).
    pub fn enqueue_change(&self, task: ProcessingTask) {
        self.enqueue_change_with_delay(task, self.config.default_debounce_delay)
    }

    pub fn enqueue_change_with_delay(&self, task: ProcessingTask, delay: Duration) {
        let path = task.relative_path.clone();
        self.inner.pending.insert(path, (task, Utc::now(), delay));
    }

    /// Bypasses the pending map and debounce entirely, pushing straight onto
    /// the ready queue. Used for immediate re-enqueue after a version
    /// mismatch discovered mid-processing.
    pub fn enqueue_direct(&self, task: ProcessingTask) {
        let _ = self.inner.ready_tx.send(task);
    }

    /// Non-blocking pop from the ready queue.
    pub fn try_dequeue(&self) -> Option<ProcessingTask> {
        self.inner.ready_rx.try_recv().ok()
    }

    /// Increments `retry_count` and pushes the task back onto the ready
    /// queue, bypassing the debounce pending map.
    pub fn requeue(&self, mut task: ProcessingTask) {
        task.retry_count += 1;
        let _ = self.inner.ready_tx.send(task);
    }

    /// Pushes the task back onto the ready queue without incrementing
    /// `retry_count` — used when a lock was contended rather than when
    /// processing itself failed.
    pub fn requeue_unchanged(&self, task: ProcessingTask) {
        let _ = self.inner.ready_tx.send(task);
    }

    /// Attempts to acquire the binary per-path lock without blocking.
    /// Returns a guard releasing it on drop, or `None` if already held.
    pub fn try_acquire_lock(&self, path: &str) -> Option<LockGuard> {
        let semaphore = self
            .inner
            .locks
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone();

        match semaphore.try_acquire() {
            Ok(permit) => {
                permit.forget();
                Some(scopeguard::guard(semaphore, release_permit))
            }
            Err(_) => None,
        }
    }

    pub fn get_version(&self, path: &str) -> Option<String> {
        self.inner.versions.lock().get(path).cloned()
    }

    pub fn set_version(&self, path: impl Into<String>, hash: impl Into<String>) {
        self.inner.versions.lock().set(path, hash);
    }

    pub fn remove_version(&self, path: &str) -> Option<String> {
        self.inner.versions.lock().remove(path)
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Ready-queue length, for diagnostics and tests only.
    pub fn ready_len(&self) -> usize {
        self.inner.ready_rx.len()
    }

    /// Pending-map size, for diagnostics and tests only.
    pub fn pending_len(&self) -> usize {
        self.inner.pending.len()
    }
}

fn release_permit(s: Arc<Semaphore>) {
    s.add_permits(1);
}

fn promote_elapsed(inner: &Arc<QueueManagerInner>) {
    let now = Utc::now();
    let elapsed_paths: Vec<String> = inner
        .pending
        .iter()
        .filter(|entry| {
            let (_, enqueued_at, delay) = entry.value();
            let delay = chrono::Duration::from_std(*delay).unwrap_or_default();
            now - *enqueued_at >= delay
        })
        .map(|entry| entry.key().clone())
        .collect();

    for path in elapsed_paths {
        if let Some((_, (task, _, _))) = inner.pending.remove(&path) {
            let _ = inner.ready_tx.send(task);
        }
    }
}

fn persist(inner: &Arc<QueueManagerInner>) -> Result<()> {
    let snapshot = inner.versions.lock().clone();
    inner.version_store.save(&snapshot)
}
