//! Read-path error types
//!
//! Error codes:
//! - AERO_READ_INVALID_ARGUMENT (scope: read)
//! - AERO_READ_PLANNING (scope: read)
//! - AERO_READ_REMOTE (scope: partition)
//! - AERO_READ_CANCELLED (scope: partition)
//!
//! Read-scoped errors abort the whole read before any partition starts.
//! Partition-scoped errors fail only the task that hit them; the host decides
//! whether to retry that task or fail the read.

use thiserror::Error;

use crate::planner::PlannerError;

use super::remote::RemoteError;

/// Result type for read operations
pub type ReadResult<T> = Result<T, ReadError>;

/// How far an error reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Terminal for the whole read
    Read,
    /// Terminal for one partition task only
    Partition,
}

/// Read-path errors
#[derive(Debug, Clone, Error)]
pub enum ReadError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Planning(#[from] PlannerError),

    #[error("Remote execution failed: {0}")]
    RemoteExecution(#[from] RemoteError),

    #[error("Read cancelled")]
    Cancelled,
}

impl ReadError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ReadError::InvalidArgument(message.into())
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ReadError::InvalidArgument(_) => "AERO_READ_INVALID_ARGUMENT",
            ReadError::Planning(err) => err.code().code(),
            ReadError::RemoteExecution(_) => "AERO_READ_REMOTE",
            ReadError::Cancelled => "AERO_READ_CANCELLED",
        }
    }

    /// Returns how far this error reaches
    pub fn scope(&self) -> ErrorScope {
        match self {
            ReadError::InvalidArgument(_) | ReadError::Planning(_) => ErrorScope::Read,
            ReadError::RemoteExecution(_) | ReadError::Cancelled => ErrorScope::Partition,
        }
    }

    /// Returns true if the whole read must be aborted
    pub fn is_fatal(&self) -> bool {
        self.scope() == ErrorScope::Read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            ReadError::invalid_argument("x").code(),
            "AERO_READ_INVALID_ARGUMENT"
        );
        assert_eq!(ReadError::Cancelled.code(), "AERO_READ_CANCELLED");
        assert_eq!(
            ReadError::from(RemoteError::unavailable("down")).code(),
            "AERO_READ_REMOTE"
        );
    }

    #[test]
    fn test_planner_errors_keep_their_code() {
        let err: ReadError = PlannerError::invalid_argument("batch size must be at least 1").into();
        assert_eq!(err.code(), "AERO_READ_INVALID_ARGUMENT");
        assert!(err.is_fatal());

        let err: ReadError = PlannerError::planning("no source").into();
        assert_eq!(err.code(), "AERO_READ_PLANNING");
    }

    #[test]
    fn test_remote_errors_are_partition_scoped() {
        let err: ReadError = RemoteError::no_such_database("missing").into();
        assert_eq!(err.scope(), ErrorScope::Partition);
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("No such database missing"));
    }
}
