//! Query pipeline error type
//!
//! Wraps the subsystem errors so callers handle a single type. Storage
//! errors pass through unchanged, except a cancelled scan which surfaces as
//! `QueryError::Cancelled`.

use thiserror::Error;

use crate::planner::PlannerError;
use crate::schema::SchemaError;
use crate::selection::SelectionError;
use crate::store::StoreError;

/// Errors surfaced by query execution
#[derive(Debug, Error)]
pub enum QueryError {
    /// Request rejected while planning
    #[error(transparent)]
    Planner(#[from] PlannerError),

    /// Storage failure
    #[error(transparent)]
    Store(StoreError),

    /// Table schema is unusable
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Selection could not be resolved to keys
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Query was cancelled or superseded
    #[error("Query cancelled")]
    Cancelled,

    /// Request does not make sense for this engine
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Request names a table the engine does not serve
    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    /// Worker thread failed
    #[error("Query worker failed: {0}")]
    Worker(String),
}

impl QueryError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Planner(e) => e.code().code(),
            QueryError::Store(e) => e.code().code(),
            QueryError::Schema(e) => e.code().code(),
            QueryError::Selection(e) => e.code().code(),
            QueryError::Cancelled => "SCOPE_QUERY_CANCELLED",
            QueryError::InvalidRequest(_) => "SCOPE_QUERY_INVALID",
            QueryError::UnknownTable(_) => "SCOPE_QUERY_UNKNOWN_TABLE",
            QueryError::Worker(_) => "SCOPE_QUERY_WORKER_FAILED",
        }
    }

    /// Returns true for cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueryError::Cancelled)
    }
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        if err.is_cancelled() {
            QueryError::Cancelled
        } else {
            QueryError::Store(err)
        }
    }
}

/// Result type for query execution
pub type QueryResult<T> = Result<T, QueryError>;
