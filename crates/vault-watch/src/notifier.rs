use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use vault_core::{ChangeObserver, FileChangeEvent, FileChangeKind, ChangeOrigin};

use crate::event::{FileEvent, FileEventKind};
use crate::handler::EventHandler;

/// `(kind, physical_path, second)` — the echo-suppression key. Two events
/// sharing this key within the same or adjacent second are the same mutation
/// seen twice: once from the application, once from the OS watcher.
type SuppressionKey = (FileChangeKind, String, i64);

/// Merges OS-level watch events (delivered via `EventHandler::handle`) with
/// explicit application-originated notifications, suppressing the echo that
/// occurs when the application's own write triggers the watcher it is also
/// subscribed to. Publishes merged events to a synchronous observer list and
/// an asynchronous bounded channel.
pub struct FileChangeNotifier {
    observers: Mutex<Vec<Arc<dyn ChangeObserver>>>,
    sender: flume::Sender<FileChangeEvent>,
    receiver: flume::Receiver<FileChangeEvent>,
    suppressed: Mutex<HashSet<SuppressionKey>>,
}

impl FileChangeNotifier {
    const CHANNEL_CAPACITY: usize = 1000;
    const SUPPRESSION_WINDOW_SECS: i64 = 5;

    pub fn new() -> Arc<Self> {
        let (sender, receiver) = flume::bounded(Self::CHANNEL_CAPACITY);
        Arc::new(Self {
            observers: Mutex::new(Vec::new()),
            sender,
            receiver,
            suppressed: Mutex::new(HashSet::new()),
        })
    }

    pub fn register_observer(&self, observer: Arc<dyn ChangeObserver>) {
        self.observers.lock().push(observer);
    }

    /// Subscribe to the asynchronous, lossy (drop-oldest) event stream.
    pub fn subscribe(&self) -> flume::Receiver<FileChangeEvent> {
        self.receiver.clone()
    }

    /// Record an application-originated mutation and publish it immediately.
    #[allow(clippy::too_many_arguments)]
    pub async fn notify_application_change(
        &self,
        kind: FileChangeKind,
        relative_path: impl Into<String>,
        physical_path: impl Into<String>,
        is_directory: bool,
        old_relative_path: Option<String>,
        old_physical_path: Option<String>,
    ) {
        let relative_path = relative_path.into();
        let physical_path = physical_path.into();
        let now = Utc::now();

        self.suppressed
            .lock()
            .insert(suppression_key(kind, &physical_path, now));

        let event = FileChangeEvent {
            kind,
            origin: ChangeOrigin::WebDav,
            relative_path,
            physical_path,
            is_directory,
            old_relative_path,
            old_physical_path,
            timestamp_utc: now,
        };

        self.publish(event).await;
    }

    /// Drop suppression-set entries older than the suppression window. Meant
    /// to be driven by a 5-second timer in the owning task.
    pub fn prune_suppressed(&self) {
        let cutoff = Utc::now().timestamp() - Self::SUPPRESSION_WINDOW_SECS;
        self.suppressed.lock().retain(|(_, _, second)| *second >= cutoff);
    }

    async fn publish(&self, event: FileChangeEvent) {
        let observers = self.observers.lock().clone();
        for observer in &observers {
            observer.on_change(&event).await;
        }

        // Bounded channel, drop-oldest overflow: if full, evict the oldest
        // queued event to make room rather than block the publisher.
        if self.sender.try_send(event.clone()).is_err() {
            let _ = self.receiver.try_recv();
            let _ = self.sender.try_send(event);
        }
    }

    fn is_echo(&self, kind: FileChangeKind, physical_path: &str, timestamp: chrono::DateTime<Utc>) -> bool {
        let suppressed = self.suppressed.lock();
        let current = suppression_key(kind, physical_path, timestamp);
        let previous = (kind, physical_path.to_string(), timestamp.timestamp() - 1);
        suppressed.contains(&current) || suppressed.contains(&previous)
    }
}

fn suppression_key(kind: FileChangeKind, physical_path: &str, at: chrono::DateTime<Utc>) -> SuppressionKey {
    (kind, physical_path.to_string(), at.timestamp())
}

fn convert_kind(kind: &FileEventKind) -> FileChangeKind {
    match kind {
        FileEventKind::Created => FileChangeKind::Created,
        FileEventKind::Modified => FileChangeKind::Modified,
        FileEventKind::Deleted => FileChangeKind::Deleted,
        FileEventKind::Moved { .. } => FileChangeKind::Moved,
    }
}

/// Registered with `WatchManager` to feed raw OS events into the notifier.
/// Directory `Modified` events are dropped; directory `Created`/`Deleted`/
/// `Moved` are forwarded, matching the worker's file-only processing model.
#[async_trait]
impl EventHandler for FileChangeNotifier {
    async fn handle(&self, event: FileEvent) -> crate::error::Result<()> {
        if event.is_directory && matches!(event.kind, FileEventKind::Modified) {
            return Ok(());
        }

        let kind = convert_kind(&event.kind);
        let physical_path = event.path.to_string_lossy().to_string();
        let now = Utc::now();

        if self.is_echo(kind, &physical_path, now) {
            return Ok(());
        }

        let old_physical_path = match &event.kind {
            FileEventKind::Moved { from } => Some(from.to_string_lossy().to_string()),
            _ => None,
        };

        let change = FileChangeEvent {
            kind,
            origin: ChangeOrigin::FileSystem,
            relative_path: physical_path.clone(),
            physical_path,
            is_directory: event.is_directory,
            old_relative_path: old_physical_path.clone(),
            old_physical_path,
            timestamp_utc: now,
        };

        self.publish(change).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file_change_notifier"
    }
}

/// Spawns the 5-second suppression-set pruning timer. Returns a handle the
/// owner can abort on shutdown.
pub fn spawn_pruning_timer(notifier: Arc<FileChangeNotifier>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            notifier.prune_suppressed();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingObserver {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ChangeObserver for CountingObserver {
        async fn on_change(&self, _event: &FileChangeEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn application_change_suppresses_matching_os_echo() {
        let notifier = FileChangeNotifier::new();
        let count = Arc::new(AtomicUsize::new(0));
        notifier.register_observer(Arc::new(CountingObserver {
            count: Arc::clone(&count),
        }));

        notifier
            .notify_application_change(
                FileChangeKind::Modified,
                "b.txt",
                "/vault/b.txt",
                false,
                None,
                None,
            )
            .await;

        let echo = FileEvent::new(FileEventKind::Modified, PathBuf::from("/vault/b.txt"), false);
        notifier.handle(echo).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1, "the echo must not be re-published");
    }

    #[tokio::test]
    async fn unrelated_os_event_is_not_suppressed() {
        let notifier = FileChangeNotifier::new();
        let count = Arc::new(AtomicUsize::new(0));
        notifier.register_observer(Arc::new(CountingObserver {
            count: Arc::clone(&count),
        }));

        let event = FileEvent::new(FileEventKind::Created, PathBuf::from("/vault/c.txt"), false);
        notifier.handle(event).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn directory_modified_event_is_dropped() {
        let notifier = FileChangeNotifier::new();
        let count = Arc::new(AtomicUsize::new(0));
        notifier.register_observer(Arc::new(CountingObserver {
            count: Arc::clone(&count),
        }));

        let event = FileEvent::new(FileEventKind::Modified, PathBuf::from("/vault/dir"), true);
        notifier.handle(event).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn directory_created_event_is_forwarded() {
        let notifier = FileChangeNotifier::new();
        let count = Arc::new(AtomicUsize::new(0));
        notifier.register_observer(Arc::new(CountingObserver {
            count: Arc::clone(&count),
        }));

        let event = FileEvent::new(FileEventKind::Created, PathBuf::from("/vault/dir"), true);
        notifier.handle(event).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscriber_channel_receives_published_events() {
        let notifier = FileChangeNotifier::new();
        let rx = notifier.subscribe();

        notifier
            .notify_application_change(
                FileChangeKind::Created,
                "a.txt",
                "/vault/a.txt",
                false,
                None,
                None,
            )
            .await;

        let event = rx.try_recv().expect("event should be queued");
        assert_eq!(event.relative_path, "a.txt");
    }
}
