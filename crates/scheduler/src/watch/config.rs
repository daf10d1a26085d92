use std::num::NonZeroU32;
use std::time::Duration;

use utils::time_range::TimeRange;

/// Whether [`watch`](super::watch) waits for the initial list before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    /// List, deliver `on_add` for every item, then return.
    Sync,
    /// Return immediately; listing and the initial adds happen on the
    /// background task.
    Async,
}

/// Retry policy and identity of a single watch.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Name used in logs, e.g. `"pods"`.
    pub log_name: String,
    /// Delay before retrying a failed list.
    pub retry_relist_after: TimeRange,
    /// Delay before reopening a watch that failed or closed.
    pub retry_watch_after: TimeRange,
    /// Attempts allowed for the initial list in [`InitMode::Sync`] before
    /// giving up. `None` retries until cancelled.
    pub initial_list_attempts: Option<NonZeroU32>,
}

impl WatchConfig {
    pub fn new(log_name: impl Into<String>) -> Self {
        let default_retry = TimeRange::new(Duration::from_millis(1), 250, 750);
        Self {
            log_name: log_name.into(),
            retry_relist_after: default_retry,
            retry_watch_after: default_retry,
            initial_list_attempts: NonZeroU32::new(5),
        }
    }

    pub fn retry_relist_after(mut self, range: TimeRange) -> Self {
        self.retry_relist_after = range;
        self
    }

    pub fn retry_watch_after(mut self, range: TimeRange) -> Self {
        self.retry_watch_after = range;
        self
    }

    pub fn initial_list_attempts(mut self, attempts: Option<NonZeroU32>) -> Self {
        self.initial_list_attempts = attempts;
        self
    }
}
