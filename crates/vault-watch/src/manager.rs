use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecursiveMode, Watcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, FileIdMap};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::error::{Result, WatchError};
use crate::event::{FileEvent, FileEventKind};
use crate::filter::WatchConfig;
use crate::handler::EventHandler;

#[derive(Debug, Clone)]
pub struct WatchManagerConfig {
    pub queue_capacity: usize,
    pub debounce_delay: Duration,
    pub enable_default_handlers: bool,
    pub max_concurrent_handlers: usize,
    pub enable_monitoring: bool,
}

impl Default for WatchManagerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            debounce_delay: Duration::from_millis(1000),
            enable_default_handlers: true,
            max_concurrent_handlers: 10,
            enable_monitoring: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WatchStatus {
    pub is_running: bool,
    pub active_watches: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceStats {
    pub total_events: u64,
}

/// Owns the OS-level watcher and the registered handler fan-out. Mirrors
/// the teacher's notifier surface: `start`/`shutdown`/`add_watch`/
/// `register_handler`, plus lightweight status/perf accessors.
pub struct WatchManager {
    config: WatchManagerConfig,
    handlers: Mutex<Vec<Arc<dyn EventHandler>>>,
    watches: Mutex<HashMap<PathBuf, WatchConfig>>,
    debouncer: Mutex<Option<Debouncer<notify::RecommendedWatcher, FileIdMap>>>,
    handler_semaphore: Arc<Semaphore>,
    running: AtomicBool,
    total_events: Arc<AtomicU64>,
}

impl WatchManager {
    pub async fn new(config: WatchManagerConfig) -> Result<Self> {
        let max_concurrent = config.max_concurrent_handlers.max(1);
        Ok(Self {
            config,
            handlers: Mutex::new(Vec::new()),
            watches: Mutex::new(HashMap::new()),
            debouncer: Mutex::new(None),
            handler_semaphore: Arc::new(Semaphore::new(max_concurrent)),
            running: AtomicBool::new(false),
            total_events: Arc::new(AtomicU64::new(0)),
        })
    }

    pub async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> Result<()> {
        self.handlers.lock().push(handler);
        Ok(())
    }

    pub async fn start(&mut self) -> Result<()> {
        let handlers = self.handlers.lock().clone();
        let semaphore = Arc::clone(&self.handler_semaphore);
        let total_events = Arc::clone(&self.total_events);

        let (tx, rx) = std::sync::mpsc::channel::<DebounceEventResult>();
        let debouncer = new_debouncer(self.config.debounce_delay, None, move |result| {
            let _ = tx.send(result);
        })
        .map_err(WatchError::from)?;

        self.debouncer.lock().replace(debouncer);
        self.running.store(true, Ordering::SeqCst);

        tokio::task::spawn_blocking(move || {
            for result in rx {
                match result {
                    Ok(events) => {
                        for event in events {
                            dispatch_notify_event(&event, &handlers, &semaphore, &total_events);
                        }
                    }
                    Err(_errors) => {
                        // Kernel buffer overflow or similar: the watcher
                        // stays armed, lost events are acceptable (C7's
                        // hash-based dedup catches missed changes).
                        tracing::warn!("watcher reported an error batch; continuing");
                    }
                }
            }
        });

        Ok(())
    }

    pub async fn add_watch(&self, path: PathBuf, watch_config: WatchConfig) -> Result<()> {
        let recursive_mode = if watch_config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        if let Some(debouncer) = self.debouncer.lock().as_mut() {
            debouncer
                .watcher()
                .watch(&path, recursive_mode)
                .map_err(WatchError::from)?;
        } else {
            return Err(WatchError::NotRunning);
        }

        self.watches.lock().insert(path, watch_config);
        Ok(())
    }

    pub async fn remove_watch(&self, path: &PathBuf) -> Result<()> {
        if let Some(debouncer) = self.debouncer.lock().as_mut() {
            debouncer.watcher().unwatch(path).map_err(WatchError::from)?;
        }
        self.watches.lock().remove(path);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.debouncer.lock().take();
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub async fn get_status(&self) -> WatchStatus {
        WatchStatus {
            is_running: self.running.load(Ordering::SeqCst),
            active_watches: self.watches.lock().len(),
        }
    }

    pub async fn get_performance_stats(&self) -> PerformanceStats {
        PerformanceStats {
            total_events: self.total_events.load(Ordering::SeqCst),
        }
    }
}

fn dispatch_notify_event(
    event: &notify_debouncer_full::DebouncedEvent,
    handlers: &[Arc<dyn EventHandler>],
    semaphore: &Arc<Semaphore>,
    total_events: &Arc<AtomicU64>,
) {
    let Some(file_event) = convert_event(event) else {
        return;
    };

    total_events.fetch_add(1, Ordering::SeqCst);

    for handler in handlers {
        if !handler.can_handle(&file_event) {
            continue;
        }
        let handler = Arc::clone(handler);
        let event = file_event.clone();
        let semaphore = Arc::clone(semaphore);
        tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return;
            };
            if let Err(e) = handler.handle(event).await {
                tracing::warn!(handler = handler.name(), error = %e, "handler failed");
            }
        });
    }
}

fn convert_event(event: &notify_debouncer_full::DebouncedEvent) -> Option<FileEvent> {
    use notify::EventKind;

    let path = event.event.paths.first()?.clone();
    let is_directory = path.is_dir();

    let kind = match &event.event.kind {
        EventKind::Create(_) => FileEventKind::Created,
        EventKind::Modify(_) => FileEventKind::Modified,
        EventKind::Remove(_) => FileEventKind::Deleted,
        _ => return None,
    };

    Some(FileEvent::new(kind, path, is_directory))
}
