//! Query execution
//!
//! The executor consumes plans and produces one page of rows plus the total
//! number of matching rows.
//!
//! # Execution Flow
//!
//! 1. Plan the request
//! 2. Count the filtered collection (native order) or materialize and sort
//!    it in memory
//! 3. Apply the page window
//! 4. Shape response rows
//!
//! Queries check a cancellation token between steps and on every scanned
//! row. `QueryWorker` runs them on blocking threads and cancels a running
//! query when a newer one is submitted.

mod errors;
mod executor;
mod result;
mod sorter;
mod worker;

pub use errors::{QueryError, QueryResult};
pub use executor::QueryExecutor;
pub use result::{shape_row, QueryResponse};
pub use sorter::ResultSorter;
pub use worker::{QueryHandle, QueryWorker};
