//! Filter error types
//!
//! Error codes:
//! - SCOPE_FILTER_UNKNOWN_METHOD (REJECT)
//! - SCOPE_FILTER_INVALID_PATTERN (REJECT)
//! - SCOPE_FILTER_INVALID_SEARCH (REJECT)

use std::fmt;

/// Filter-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterErrorCode {
    /// Method name is not part of the vocabulary
    UnknownMethod,
    /// Regular expression does not compile
    InvalidPattern,
    /// Search text is not acceptable for the method
    InvalidSearch,
}

impl FilterErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            FilterErrorCode::UnknownMethod => "SCOPE_FILTER_UNKNOWN_METHOD",
            FilterErrorCode::InvalidPattern => "SCOPE_FILTER_INVALID_PATTERN",
            FilterErrorCode::InvalidSearch => "SCOPE_FILTER_INVALID_SEARCH",
        }
    }
}

impl fmt::Display for FilterErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Filter error with context
#[derive(Debug, Clone, PartialEq)]
pub struct FilterError {
    code: FilterErrorCode,
    message: String,
}

impl FilterError {
    /// Create an unknown method error
    pub fn unknown_method(name: impl Into<String>) -> Self {
        Self {
            code: FilterErrorCode::UnknownMethod,
            message: format!("Unknown filter method '{}'", name.into()),
        }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(field: &str, reason: impl fmt::Display) -> Self {
        Self {
            code: FilterErrorCode::InvalidPattern,
            message: format!("Invalid regular expression on '{}': {}", field, reason),
        }
    }

    /// Create an invalid search error
    pub fn invalid_search(field: &str, reason: impl Into<String>) -> Self {
        Self {
            code: FilterErrorCode::InvalidSearch,
            message: format!("Invalid search on '{}': {}", field, reason.into()),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> FilterErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REJECT] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for FilterError {}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            FilterError::unknown_method("like").code().code(),
            "SCOPE_FILTER_UNKNOWN_METHOD"
        );
        let err = FilterError::invalid_search("tags", "expected yes or no");
        assert!(err.to_string().contains("SCOPE_FILTER_INVALID_SEARCH"));
        assert!(err.message().contains("tags"));
    }
}
