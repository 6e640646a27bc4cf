//! Table schema subsystem
//!
//! Describes the primary key shape and secondary indexes of a table.
//! The planner uses it to turn index-flagged filters into lookup targets
//! and to decide whether a sort can reuse an index order.

mod errors;
mod types;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult};
pub use types::{IndexSpec, PrimaryKey, TableSchema, UNNAMED_KEY_INDEX};
