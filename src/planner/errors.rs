//! Planner error types
//!
//! Error codes:
//! - SCOPE_QUERY_INVALID (REJECT)
//! - SCOPE_QUERY_FILTER_INVALID (REJECT)
//! - SCOPE_QUERY_UNINDEXED_FIELD (REJECT)
//! - SCOPE_QUERY_LIMIT_REQUIRED (REJECT)
//!
//! Contradictory filters are never an error; they plan to an empty lookup.

use std::fmt;

use crate::filter::FilterError;
use crate::schema::SchemaError;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
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
    /// Malformed request
    QueryInvalid,
    /// A filter cannot be compiled
    FilterInvalid,
    /// A filter is flagged indexed but the table has no matching index
    UnindexedField,
    /// Page size is zero
    LimitRequired,
}

impl PlannerErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::QueryInvalid => "SCOPE_QUERY_INVALID",
            PlannerErrorCode::FilterInvalid => "SCOPE_QUERY_FILTER_INVALID",
            PlannerErrorCode::UnindexedField => "SCOPE_QUERY_UNINDEXED_FIELD",
            PlannerErrorCode::LimitRequired => "SCOPE_QUERY_LIMIT_REQUIRED",
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
#[derive(Debug, Clone)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
    field: Option<String>,
}

impl PlannerError {
    /// Create a query invalid error
    pub fn query_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::QueryInvalid,
            message: reason.into(),
            field: None,
        }
    }

    /// Create a filter invalid error
    pub fn filter_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::FilterInvalid,
            message: reason.into(),
            field: Some(field.into()),
        }
    }

    /// Create an unindexed field error
    pub fn unindexed_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::UnindexedField,
            message: reason.into(),
            field: Some(field.into()),
        }
    }

    /// Create a limit required error
    pub fn limit_required() -> Self {
        Self {
            code: PlannerErrorCode::LimitRequired,
            message: "Query must include a positive limit".into(),
            field: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the field name if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
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

impl From<SchemaError> for PlannerError {
    fn from(err: SchemaError) -> Self {
        let field = err.field().unwrap_or_default().to_string();
        PlannerError::unindexed_field(field, err.message())
    }
}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Attaches the filter's field to a compilation error
pub(crate) fn filter_error(field: &str, err: FilterError) -> PlannerError {
    PlannerError::filter_invalid(field, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PlannerError::limit_required().code().code(),
            "SCOPE_QUERY_LIMIT_REQUIRED"
        );
        assert_eq!(
            PlannerError::query_invalid("x").code().code(),
            "SCOPE_QUERY_INVALID"
        );
    }

    #[test]
    fn test_error_display() {
        let err = PlannerError::unindexed_field("age", "Field 'age' has no index");
        let display = format!("{}", err);
        assert!(display.contains("REJECT"));
        assert!(display.contains("SCOPE_QUERY_UNINDEXED_FIELD"));
        assert_eq!(err.field(), Some("age"));
    }

    #[test]
    fn test_from_schema_error() {
        let err: PlannerError = SchemaError::no_index("age").into();
        assert_eq!(err.code(), PlannerErrorCode::UnindexedField);
        assert_eq!(err.field(), Some("age"));
    }
}
