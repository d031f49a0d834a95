//! Planner error types
//!
//! Error codes:
//! - AERO_READ_INVALID_ARGUMENT (REJECT)
//! - AERO_READ_PLANNING (REJECT)
//!
//! Both are raised before any remote call is issued and abort the whole read.

use std::fmt;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Read request rejected before execution
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Planner-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// Partition count, batch size or domain out of range
    AeroReadInvalidArgument,
    /// Plan cannot be rewritten with a bound row-id filter
    AeroReadPlanning,
}

impl PlannerErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::AeroReadInvalidArgument => "AERO_READ_INVALID_ARGUMENT",
            PlannerErrorCode::AeroReadPlanning => "AERO_READ_PLANNING",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerError {
    /// Error code
    code: PlannerErrorCode,
    /// Human-readable message
    message: String,
    /// Offending plan stage, if applicable
    stage: Option<String>,
}

impl PlannerError {
    /// Create an invalid argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::AeroReadInvalidArgument,
            message: reason.into(),
            stage: None,
        }
    }

    /// Create a planning error that is not tied to a single stage
    pub fn planning(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::AeroReadPlanning,
            message: reason.into(),
            stage: None,
        }
    }

    /// Create a planning error for a stage that blocks the bound filter
    pub fn unboundable_stage(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        let s = stage.into();
        Self {
            code: PlannerErrorCode::AeroReadPlanning,
            message: format!("Stage '{}' cannot be partitioned: {}", s, reason.into()),
            stage: Some(s),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending stage name if applicable
    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PlannerErrorCode::AeroReadInvalidArgument.code(),
            "AERO_READ_INVALID_ARGUMENT"
        );
        assert_eq!(PlannerErrorCode::AeroReadPlanning.code(), "AERO_READ_PLANNING");
    }

    #[test]
    fn test_unboundable_stage_records_stage() {
        let err = PlannerError::unboundable_stage("group_by", "aggregates do not union");
        assert_eq!(err.stage(), Some("group_by"));
        assert_eq!(err.code(), PlannerErrorCode::AeroReadPlanning);
    }

    #[test]
    fn test_error_display() {
        let err = PlannerError::invalid_argument("partition count must be at least 1");
        let display = format!("{}", err);
        assert!(display.contains("REJECT"));
        assert!(display.contains("AERO_READ_INVALID_ARGUMENT"));
        assert!(display.contains("partition count"));
    }
}
