use std::time::Duration;

use crate::event::FileEvent;

/// Per-watch debounce tuning, independent of C7's queue-level debounce —
/// this one coalesces raw filesystem notifications before they even reach
/// the notifier.
#[derive(Debug, Clone, Copy)]
pub struct DebounceConfig {
    pub delay: Duration,
}

impl DebounceConfig {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
        }
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Extension/pattern filter applied to raw events before they are published.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    extensions: Vec<String>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions.push(ext.into());
        self
    }

    pub fn matches(&self, event: &FileEvent) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        match event.path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }
}

/// Per-watch configuration: recursion, debounce, and filter.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub label: String,
    pub recursive: bool,
    pub debounce: DebounceConfig,
    pub filter: EventFilter,
}

impl WatchConfig {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            recursive: false,
            debounce: DebounceConfig::default(),
            filter: EventFilter::default(),
        }
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_debounce(mut self, debounce: DebounceConfig) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = filter;
        self
    }
}

pub mod prelude {
    pub use super::WatchConfig as TraitWatchConfig;
}
