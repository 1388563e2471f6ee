//! Long-running operation (LRO) polling
//!
//! A mutating ARM call either finishes synchronously or hands back a handle
//! that must be polled until the service reports a terminal state. This module
//! is the transport-agnostic half of that contract:
//!
//! - [`Operation`] - a pollable handle with a typed final result
//! - [`Submission`] - what a mutating call returns: done, or pending
//! - [`PollContext`] - deadline, poll interval and cancellation for one wait
//! - [`Poller`] / [`wait_for_completion`] / [`complete`] - the waiter
//!
//! Per operation the waiter walks
//! `Submitted -> Polling -> {Succeeded, Failed, Cancelled, TimedOut}`.
//! There is no transition back to `Submitted`: the mutating request is never
//! re-sent from here.

mod poller;

pub use poller::{Poller, complete, wait_for_completion};

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default time to wait for an operation before giving up
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Default delay between polls when the service gives no `Retry-After`
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Lifecycle of a single operation as seen by the waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    /// Request accepted, waiting not yet started
    Submitted,
    /// At least one poll issued, no terminal status yet
    Polling,
    /// Service reported success
    Succeeded,
    /// Service reported failure
    Failed,
    /// Cancelled by the caller or by the service
    Cancelled,
    /// Deadline elapsed before a terminal status
    TimedOut,
}

impl OperationState {
    /// True for the four end states
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Succeeded
                | OperationState::Failed
                | OperationState::Cancelled
                | OperationState::TimedOut
        )
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationState::Submitted => "submitted",
            OperationState::Polling => "polling",
            OperationState::Succeeded => "succeeded",
            OperationState::Failed => "failed",
            OperationState::Cancelled => "cancelled",
            OperationState::TimedOut => "timed-out",
        };
        f.write_str(s)
    }
}

/// Outcome of a single poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    /// Still running; `status` is the raw service status (e.g. "InProgress")
    InProgress { status: String },
    Succeeded,
    Failed { reason: String },
    Cancelled,
}

impl PollStatus {
    pub fn in_progress(status: impl Into<String>) -> Self {
        PollStatus::InProgress {
            status: status.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        PollStatus::Failed {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollStatus::InProgress { .. })
    }
}

/// A pollable handle for a server-side operation
///
/// `poll` asks the service once for the current status. `result` is only
/// called by the waiter after a poll returned [`PollStatus::Succeeded`] and
/// produces the final typed value.
#[async_trait]
pub trait Operation: Send {
    /// Final value produced once the operation succeeds
    type Output: Send + 'static;

    /// Identifier used in logs, progress events and errors
    fn id(&self) -> &str;

    /// Query the service once
    async fn poll(&mut self) -> Result<PollStatus>;

    /// Service-requested delay before the next poll, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }

    /// Fetch the final value
    async fn result(self) -> Result<Self::Output>
    where
        Self: Sized;
}

/// What a mutating call hands back
#[derive(Debug)]
pub enum Submission<T, O> {
    /// Service finished synchronously
    Completed(T),
    /// Service accepted the request and is still working on it
    Pending(O),
}

impl<T, O> Submission<T, O> {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Submission::Pending(_))
    }
}

/// Deadline, interval and cancellation for one wait
#[derive(Debug, Clone)]
pub struct PollContext {
    timeout: Duration,
    interval: Duration,
    cancellation: CancellationToken,
}

impl Default for PollContext {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_TIMEOUT)
    }
}

impl PollContext {
    /// Wait at most `timeout` with the default interval and a fresh token
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: DEFAULT_POLL_INTERVAL,
            cancellation: CancellationToken::new(),
        }
    }

    /// Set the delay between polls
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Use an existing cancellation token (e.g. one tied to Ctrl-C)
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Clone of the token; cancelling it aborts the wait
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!OperationState::Submitted.is_terminal());
        assert!(!OperationState::Polling.is_terminal());
        assert!(OperationState::Succeeded.is_terminal());
        assert!(OperationState::Failed.is_terminal());
        assert!(OperationState::Cancelled.is_terminal());
        assert!(OperationState::TimedOut.is_terminal());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(OperationState::TimedOut.to_string(), "timed-out");
        assert_eq!(OperationState::Polling.to_string(), "polling");
    }

    #[test]
    fn test_poll_status_terminal() {
        assert!(!PollStatus::in_progress("Running").is_terminal());
        assert!(PollStatus::Succeeded.is_terminal());
        assert!(PollStatus::failed("boom").is_terminal());
        assert!(PollStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_poll_context_builders() {
        let token = CancellationToken::new();
        let ctx = PollContext::new(Duration::from_secs(30))
            .with_interval(Duration::from_millis(250))
            .with_cancellation(token.clone());

        assert_eq!(ctx.timeout(), Duration::from_secs(30));
        assert_eq!(ctx.interval(), Duration::from_millis(250));

        token.cancel();
        assert!(ctx.cancellation_token().is_cancelled());
    }

    #[test]
    fn test_poll_context_default() {
        let ctx = PollContext::default();
        assert_eq!(ctx.timeout(), DEFAULT_POLL_TIMEOUT);
        assert_eq!(ctx.interval(), DEFAULT_POLL_INTERVAL);
        assert!(!ctx.cancellation_token().is_cancelled());
    }
}
