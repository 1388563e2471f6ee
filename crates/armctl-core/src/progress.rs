//! Progress events for long-running operations
//!
//! The waiter in [`crate::lro`] emits these so a CLI can drive a spinner
//! while a library caller can simply pass `None`.

use std::time::Duration;

/// Progress events emitted while waiting on an operation
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Waiting has begun
    Started { operation: String },
    /// One poll came back with a non-terminal status
    Polling {
        operation: String,
        status: String,
        iteration: u32,
        elapsed: Duration,
    },
    /// Operation reached `Succeeded`
    Completed { operation: String, elapsed: Duration },
    /// Operation ended in any other way
    Failed { operation: String, error: String },
}

impl ProgressEvent {
    /// Operation identifier the event refers to
    pub fn operation(&self) -> &str {
        match self {
            ProgressEvent::Started { operation }
            | ProgressEvent::Polling { operation, .. }
            | ProgressEvent::Completed { operation, .. }
            | ProgressEvent::Failed { operation, .. } => operation,
        }
    }
}

/// Callback type for progress updates
///
/// CLI can use this to update spinners/progress bars.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Helper to emit progress events
pub(crate) fn emit(callback: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
