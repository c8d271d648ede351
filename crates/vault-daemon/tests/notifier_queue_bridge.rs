//! The C6 -> C7 handoff: every `FileChangeEvent` the notifier emits becomes
//! a debounced `ProcessingTask` on the queue, skipping directory events and
//! routing deletions through the is_deletion flag instead of a content hash.

use std::time::Duration;

use tempfile::TempDir;
use vault_core::FileChangeKind;
use vault_daemon::app::spawn_notifier_to_queue_bridge;
use vault_queue::{QueueManager, QueueManagerConfig};
use vault_watch::FileChangeNotifier;

#[tokio::test]
async fn file_write_event_becomes_a_queued_task() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("doc.txt");
    tokio::fs::write(&file_path, "hello").await.unwrap();

    let notifier = FileChangeNotifier::new();
    let queue = std::sync::Arc::new(
        QueueManager::new(QueueManagerConfig {
            default_debounce_delay: Duration::from_millis(5),
            persist_dir: temp.path().join("queue"),
        })
        .unwrap(),
    );
    queue.start();

    let shutdown = queue.cancellation_token();
    let bridge = spawn_notifier_to_queue_bridge(notifier.clone(), std::sync::Arc::clone(&queue), shutdown.clone());

    notifier
        .notify_application_change(
            FileChangeKind::Created,
            "doc.txt".to_string(),
            file_path.to_string_lossy().into_owned(),
            false,
            None,
            None,
        )
        .await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();
    bridge.await.unwrap();

    let task = queue.try_dequeue().expect("bridge should have enqueued a task");
    assert_eq!(task.relative_path, "doc.txt");
    assert!(!task.is_deletion);
    assert!(!task.file_hash.is_empty());
}

#[tokio::test]
async fn deletion_event_enqueues_with_is_deletion_set() {
    let temp = TempDir::new().unwrap();

    let notifier = FileChangeNotifier::new();
    let queue = std::sync::Arc::new(
        QueueManager::new(QueueManagerConfig {
            default_debounce_delay: Duration::from_millis(5),
            persist_dir: temp.path().join("queue"),
        })
        .unwrap(),
    );
    queue.start();

    let shutdown = queue.cancellation_token();
    let bridge = spawn_notifier_to_queue_bridge(notifier.clone(), std::sync::Arc::clone(&queue), shutdown.clone());

    notifier
        .notify_application_change(
            FileChangeKind::Deleted,
            "gone.txt".to_string(),
            temp.path().join("gone.txt").to_string_lossy().into_owned(),
            false,
            None,
            None,
        )
        .await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();
    bridge.await.unwrap();

    let task = queue.try_dequeue().expect("bridge should have enqueued a deletion task");
    assert_eq!(task.relative_path, "gone.txt");
    assert!(task.is_deletion);
}

#[tokio::test]
async fn directory_events_are_not_enqueued() {
    let temp = TempDir::new().unwrap();

    let notifier = FileChangeNotifier::new();
    let queue = std::sync::Arc::new(
        QueueManager::new(QueueManagerConfig {
            default_debounce_delay: Duration::from_millis(5),
            persist_dir: temp.path().join("queue"),
        })
        .unwrap(),
    );
    queue.start();

    let shutdown = queue.cancellation_token();
    let bridge = spawn_notifier_to_queue_bridge(notifier.clone(), std::sync::Arc::clone(&queue), shutdown.clone());

    notifier
        .notify_application_change(
            FileChangeKind::Created,
            "subdir".to_string(),
            temp.path().join("subdir").to_string_lossy().into_owned(),
            true,
            None,
            None,
        )
        .await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();
    bridge.await.unwrap();

    assert!(queue.try_dequeue().is_none());
}
