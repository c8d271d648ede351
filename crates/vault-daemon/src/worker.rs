use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vault_core::{FileProcessor, ProcessingTask};
use vault_queue::QueueManager;

/// Idle poll interval when the ready queue is empty. Short enough to keep
/// end-to-end latency low, long enough not to spin the executor.
const IDLE_POLL: Duration = Duration::from_millis(50);

pub struct ProcessingWorkerConfig {
    pub max_retries: u32,
}

impl Default for ProcessingWorkerConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Runs C8's per-iteration state machine until `shutdown` is cancelled:
/// dequeue, acquire the per-path lock, dispatch to the deletion path or the
/// full extract+chunk+archive+index pipeline, and decide retry/requeue from
/// the result.
pub async fn run(
    queue: Arc<QueueManager>,
    processor: Arc<dyn FileProcessor>,
    config: ProcessingWorkerConfig,
    shutdown: CancellationToken,
) {
    loop {
        if shutdown.is_cancelled() {
            break;
        }

        let Some(task) = queue.try_dequeue() else {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(IDLE_POLL) => continue,
            }
        };

        let Some(_guard) = queue.try_acquire_lock(&task.relative_path) else {
            queue.requeue_unchanged(task);
            continue;
        };

        process_one(&queue, processor.as_ref(), task, &config).await;
    }

    info!("processing worker stopped");
}

async fn process_one(
    queue: &Arc<QueueManager>,
    processor: &dyn FileProcessor,
    task: ProcessingTask,
    config: &ProcessingWorkerConfig,
) {
    if task.is_deletion {
        match processor.process_deletion(&task.relative_path).await {
            Ok(()) => {
                queue.remove_version(&task.relative_path);
                debug!(path = %task.relative_path, "deletion processed");
            }
            Err(e) => error!(path = %task.relative_path, error = %e, "deletion failed"),
        }
        return;
    }

    if let Some(current) = queue.get_version(&task.relative_path) {
        if current == task.file_hash {
            debug!(path = %task.relative_path, "version already current, skipping");
            return;
        }
    }

    match processor.process(&task.relative_path, &task.physical_path).await {
        Ok(result) => {
            debug!(
                path = %task.relative_path,
                chunks = result.chunk_count,
                duration_ms = result.duration_ms,
                "processed successfully"
            );
            reconcile_version(queue, &task).await;
        }
        Err(e) if e.is_transient() => {
            if task.retry_count + 1 >= config.max_retries {
                error!(path = %task.relative_path, error = %e, retries = task.retry_count, "giving up after max retries");
            } else {
                warn!(path = %task.relative_path, error = %e, retries = task.retry_count, "transient failure, requeuing");
                queue.requeue(task);
            }
        }
        Err(e) => {
            warn!(path = %task.relative_path, error = %e, "terminal failure, not retrying");
        }
    }
}

/// After a successful process, rehash the physical file. If it still
/// matches the hash the task was enqueued with, the version map now
/// reflects exactly what was archived. If it diverged (the file was
/// rewritten mid-processing), discard this result's version bookkeeping and
/// enqueue a fresh task for the new hash, bypassing debounce.
async fn reconcile_version(queue: &Arc<QueueManager>, task: &ProcessingTask) {
    let bytes = match tokio::fs::read(&task.physical_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %task.relative_path, error = %e, "could not rehash after processing");
            return;
        }
    };

    let current_hash = vault_core::hash::file_hash(&bytes);
    if current_hash == task.file_hash {
        queue.set_version(&task.relative_path, current_hash);
    } else {
        debug!(path = %task.relative_path, "file changed mid-processing, re-enqueuing");
        queue.enqueue_direct(ProcessingTask::new(
            task.relative_path.clone(),
            task.physical_path.clone(),
            current_hash,
            false,
        ));
    }
}
