//! Unified error handling for armctl-core
//!
//! Errors fall into three families that matter to a caller waiting on a
//! long-running operation:
//!
//! - **Submission** - the initial request was rejected; nothing changed remotely
//! - **Poll** - we lost track of the operation; its real end state is unknown
//! - **Terminal** - the service reported that the operation itself failed
//!
//! # Example
//!
//! ```rust
//! use armctl_core::{CoreError, ErrorKind};
//! use std::time::Duration;
//!
//! let err = CoreError::PollTimeout {
//!     operation: "op-1".to_string(),
//!     timeout: Duration::from_secs(60),
//! };
//! assert_eq!(err.kind(), ErrorKind::Poll);
//! assert!(err.outcome_unknown());
//! ```

use std::time::Duration;
use thiserror::Error;

/// Core error type for ARM calls and operation polling
#[derive(Error, Debug)]
pub enum CoreError {
    /// ARM rejected the request with a non-success status
    #[error("ARM API error (HTTP {status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Transport failure talking to ARM
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The authorizer could not produce a token
    #[error("Authorization failed: {0}")]
    Auth(String),

    /// Response body could not be decoded into the expected type
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Deadline elapsed before the operation reached a terminal state
    #[error("Operation {operation} did not complete within {timeout:?}")]
    PollTimeout { operation: String, timeout: Duration },

    /// Caller cancelled the wait before the operation reached a terminal state
    #[error("Waiting for operation {operation} was cancelled")]
    PollCancelled { operation: String },

    /// A poll request failed, so completion could not be confirmed
    #[error("Could not confirm completion of operation {operation}: {source}")]
    PollFailed {
        operation: String,
        #[source]
        source: Box<CoreError>,
    },

    /// The service reports the operation failed
    #[error("Operation {operation} failed: {reason}")]
    OperationFailed { operation: String, reason: String },

    /// The service reports the operation was cancelled
    #[error("Operation {operation} was cancelled by the service")]
    OperationCancelled { operation: String },

    /// Invalid input (resource ids, params)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Client construction or profile problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file problem
    #[error(transparent)]
    Profile(#[from] crate::config::ConfigError),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Which phase of an operation an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request rejected before any remote side effect
    Submission,
    /// Completion could not be confirmed; remote outcome unknown
    Poll,
    /// Remote operation definitively failed or was cancelled
    Terminal,
    /// Local problem (config, validation, decoding)
    Local,
}

impl CoreError {
    /// Classify this error by operation phase
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Api { .. } | CoreError::Http(_) | CoreError::Auth(_) => {
                ErrorKind::Submission
            }
            CoreError::PollTimeout { .. }
            | CoreError::PollCancelled { .. }
            | CoreError::PollFailed { .. } => ErrorKind::Poll,
            CoreError::OperationFailed { .. } | CoreError::OperationCancelled { .. } => {
                ErrorKind::Terminal
            }
            CoreError::Decode(_)
            | CoreError::Validation(_)
            | CoreError::Config(_)
            | CoreError::Profile(_) => ErrorKind::Local,
        }
    }

    /// True when the remote operation may or may not have completed
    #[must_use]
    pub fn outcome_unknown(&self) -> bool {
        self.kind() == ErrorKind::Poll
    }

    /// HTTP status carried by this error, looking through poll wrappers
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            CoreError::Api { status, .. } => Some(*status),
            CoreError::Http(e) => e.status().map(|s| s.as_u16()),
            CoreError::PollFailed { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns true if this is an authentication/authorization error (401/403)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CoreError::Auth(_)) || matches!(self.status(), Some(401 | 403))
    }

    /// Returns true if this is a conflict error (409)
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Returns true if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(500..=599))
    }

    /// Returns true if this is a timeout error
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            CoreError::PollTimeout { .. } => true,
            CoreError::Http(e) => e.is_timeout(),
            CoreError::PollFailed { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Returns true if this error is potentially retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::PollTimeout { .. } => true,
            CoreError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => matches!(self.status(), Some(429 | 500..=599)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> CoreError {
        CoreError::Api {
            status,
            code: "Code".to_string(),
            message: "message".to_string(),
        }
    }

    #[test]
    fn test_submission_errors() {
        let err = api(400);
        assert_eq!(err.kind(), ErrorKind::Submission);
        assert!(!err.outcome_unknown());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_status_helpers() {
        assert!(api(404).is_not_found());
        assert!(api(401).is_unauthorized());
        assert!(api(403).is_unauthorized());
        assert!(api(409).is_conflict());
        assert!(api(503).is_server_error());
        assert!(api(503).is_retryable());
        assert!(api(429).is_retryable());
        assert!(CoreError::Auth("no token".to_string()).is_unauthorized());
    }

    #[test]
    fn test_poll_failed_looks_through_source() {
        let err = CoreError::PollFailed {
            operation: "op".to_string(),
            source: Box::new(api(502)),
        };
        assert_eq!(err.kind(), ErrorKind::Poll);
        assert!(err.outcome_unknown());
        assert!(err.is_server_error());
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn test_terminal_errors() {
        let failed = CoreError::OperationFailed {
            operation: "op".to_string(),
            reason: "ProvisioningFailed".to_string(),
        };
        assert_eq!(failed.kind(), ErrorKind::Terminal);
        assert!(!failed.outcome_unknown());
        assert!(!failed.is_retryable());

        let cancelled = CoreError::OperationCancelled {
            operation: "op".to_string(),
        };
        assert_eq!(cancelled.kind(), ErrorKind::Terminal);
    }

    #[test]
    fn test_poll_timeout() {
        let err = CoreError::PollTimeout {
            operation: "op".to_string(),
            timeout: Duration::from_secs(60),
        };
        assert!(err.is_timeout());
        assert!(err.is_retryable());
        assert!(err.to_string().contains("did not complete"));
    }

    #[test]
    fn test_display() {
        let err = api(404);
        assert_eq!(err.to_string(), "ARM API error (HTTP 404) Code: message");
    }
}
