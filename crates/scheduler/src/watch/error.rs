use core::error::Error;

use error_stack::Report;

/// Errors raised while listing or watching a resource collection.
#[derive(Debug, derive_more::Display)]
pub enum WatchError {
    #[display("List request failed: {message}")]
    ListFailed { message: String },
    #[display("Watch request failed: {message}")]
    WatchFailed { message: String },
    #[display("Resource version is no longer available: {message}")]
    ResourceVersionExpired { message: String },
    #[display("Initial list of {name} failed after {attempts} attempts")]
    InitialListFailed { name: String, attempts: u32 },
    #[display("Watch of {name} was cancelled")]
    Cancelled { name: String },
}

impl Error for WatchError {}

impl WatchError {
    /// Whether recovering from this error requires a full relist rather than
    /// resuming the watch.
    pub fn requires_relist(&self) -> bool {
        matches!(self, WatchError::ResourceVersionExpired { .. })
    }
}

pub(crate) fn requires_relist(report: &Report<WatchError>) -> bool {
    report.current_context().requires_relist()
}
