/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Lock errors with serialization support
///
/// Misuse is detected before the shared queue is touched, so every error
/// leaves the lock in a consistent state.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum LockError {
    #[error("Protocol violation: {0}")]
    #[diagnostic(
        code(lock::protocol_violation),
        help("release() must be called by the thread that currently holds the lock.")
    )]
    ProtocolViolation(String),

    #[error("Reentrant acquire: calling thread already holds or waits on this lock")]
    #[diagnostic(
        code(lock::reentrancy_violation),
        help("The queue lock is not reentrant. Release before acquiring again.")
    )]
    ReentrancyViolation,

    #[error("Timed out after {waited_ms}ms waiting for the lock")]
    #[diagnostic(
        code(lock::timeout),
        help("The lock stayed held for the whole wait. Increase the timeout or shorten critical sections.")
    )]
    Timeout { waited_ms: u64 },

    #[error("Worker thread panicked: {0}")]
    #[diagnostic(
        code(harness::worker_panicked),
        help("A critical section panicked. The shared array contents are unreliable.")
    )]
    WorkerPanicked(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(config::invalid),
        help("Check the MCS_* environment variables.")
    )]
    Configuration(String),
}

impl LockError {
    /// Build a timeout error from the elapsed wait
    pub fn timeout(waited: Duration) -> Self {
        LockError::Timeout {
            waited_ms: waited.as_millis().min(u64::MAX as u128) as u64,
        }
    }

    /// Whether the error reports caller misuse rather than contention
    #[inline]
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            LockError::ProtocolViolation(_) | LockError::ReentrancyViolation
        )
    }
}

/// Result alias for lock operations
pub type LockResult<T> = Result<T, LockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_conversion() {
        let err = LockError::timeout(Duration::from_millis(250));
        assert_eq!(err, LockError::Timeout { waited_ms: 250 });
        assert!(!err.is_misuse());
    }

    #[test]
    fn test_misuse_classification() {
        assert!(LockError::ReentrancyViolation.is_misuse());
        assert!(LockError::ProtocolViolation("x".into()).is_misuse());
        assert!(!LockError::Configuration("x".into()).is_misuse());
    }

    #[test]
    fn test_serialization_shape() {
        let json = serde_json::to_string(&LockError::timeout(Duration::from_millis(5))).unwrap();
        assert_eq!(json, r#"{"error_type":"timeout","details":{"waited_ms":5}}"#);

        let back: LockError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LockError::Timeout { waited_ms: 5 });
    }
}
