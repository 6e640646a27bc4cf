//! Key-value table storage
//!
//! The query engine talks to storage through `TableStore` and lazy
//! `Collection` descriptors. `MemoryTable` is the bundled implementation,
//! loaded from JSON fixtures.

mod collection;
mod errors;
mod key;
mod memory;
mod range;

pub use collection::{
    Collection, IndexTarget, Record, RecordPredicate, Source, TableStore, WhereClause,
};
pub use errors::{StoreError, StoreErrorCode, StoreResult};
pub use key::{number_to_json, IndexKey};
pub use memory::{MemoryTable, TableFixture};
pub use range::{normalize_ranges, tighter_lower, tighter_upper, KeyMatch, KeyRange};
