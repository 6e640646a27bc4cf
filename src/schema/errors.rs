//! Schema error types
//!
//! Error codes:
//! - SCOPE_SCHEMA_INVALID (REJECT)
//! - SCOPE_SCHEMA_NO_INDEX (REJECT)

use std::fmt;

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Table schema is malformed
    Invalid,
    /// A field was expected to be indexed but is not
    NoIndex,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::Invalid => "SCOPE_SCHEMA_INVALID",
            SchemaErrorCode::NoIndex => "SCOPE_SCHEMA_NO_INDEX",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error with context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    field: Option<String>,
}

impl SchemaError {
    /// Create an invalid schema error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::Invalid,
            message: reason.into(),
            field: None,
        }
    }

    /// Create a missing index error
    pub fn no_index(field: impl Into<String>) -> Self {
        let f = field.into();
        Self {
            code: SchemaErrorCode::NoIndex,
            message: format!("Field '{}' is flagged as indexed but the table has no such index", f),
            field: Some(f),
        }
    }

    /// Create a missing compound index error
    pub fn no_compound_head(field: impl Into<String>) -> Self {
        let f = field.into();
        Self {
            code: SchemaErrorCode::NoIndex,
            message: format!("Field '{}' does not lead any compound index", f),
            field: Some(f),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
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

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REJECT] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchemaError::no_index("age");
        let display = format!("{}", err);
        assert!(display.contains("SCOPE_SCHEMA_NO_INDEX"));
        assert!(display.contains("age"));
        assert_eq!(err.field(), Some("age"));
    }
}
