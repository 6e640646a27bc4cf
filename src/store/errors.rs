//! Store error types
//!
//! Error codes:
//! - SCOPE_STORE_UNKNOWN_INDEX
//! - SCOPE_STORE_INVALID_KEY
//! - SCOPE_STORE_DUPLICATE_KEY
//! - SCOPE_STORE_READ_FAILED
//! - SCOPE_STORE_CANCELLED

use std::fmt;

/// Store-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// Lookup against an index the table does not have
    UnknownIndex,
    /// Row has no usable primary key
    InvalidKey,
    /// Primary key already present
    DuplicateKey,
    /// Underlying read failed
    ReadFailed,
    /// Scan abandoned through its cancellation token
    Cancelled,
}

impl StoreErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::UnknownIndex => "SCOPE_STORE_UNKNOWN_INDEX",
            StoreErrorCode::InvalidKey => "SCOPE_STORE_INVALID_KEY",
            StoreErrorCode::DuplicateKey => "SCOPE_STORE_DUPLICATE_KEY",
            StoreErrorCode::ReadFailed => "SCOPE_STORE_READ_FAILED",
            StoreErrorCode::Cancelled => "SCOPE_STORE_CANCELLED",
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Store error with context
#[derive(Debug, Clone)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
}

impl StoreError {
    /// Create an unknown index error
    pub fn unknown_index(name: impl Into<String>) -> Self {
        Self {
            code: StoreErrorCode::UnknownIndex,
            message: format!("Index '{}' not found", name.into()),
        }
    }

    /// Create an invalid key error
    pub fn invalid_key(reason: impl Into<String>) -> Self {
        Self {
            code: StoreErrorCode::InvalidKey,
            message: reason.into(),
        }
    }

    /// Create a duplicate key error
    pub fn duplicate_key(key: impl fmt::Display) -> Self {
        Self {
            code: StoreErrorCode::DuplicateKey,
            message: format!("Key {} already exists", key),
        }
    }

    /// Create a read failure error
    pub fn read_failed(reason: impl Into<String>) -> Self {
        Self {
            code: StoreErrorCode::ReadFailed,
            message: reason.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled() -> Self {
        Self {
            code: StoreErrorCode::Cancelled,
            message: "Scan cancelled".into(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns whether the scan was cancelled rather than failed
    pub fn is_cancelled(&self) -> bool {
        self.code == StoreErrorCode::Cancelled
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for StoreError {}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
