//! Raw filesystem watching (`WatchManager`) and the merged, echo-suppressed
//! change notifier (`FileChangeNotifier`) that feeds C7's queue manager.

pub mod error;
pub mod event;
pub mod filter;
pub mod handler;
pub mod manager;
pub mod notifier;

pub use error::{Result, WatchError};
pub use event::{FileEvent, FileEventKind};
pub use filter::{DebounceConfig, EventFilter, WatchConfig};
pub use handler::EventHandler;
pub use manager::{PerformanceStats, WatchManager, WatchManagerConfig, WatchStatus};
pub use notifier::{spawn_pruning_timer, FileChangeNotifier};

pub mod prelude {
    pub use crate::filter::prelude::*;
}
