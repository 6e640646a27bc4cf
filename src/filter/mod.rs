//! Filter model and predicates
//!
//! A filter targets one field with one method and a search text. Filters
//! are either served by a storage lookup (see the planner) or compiled
//! into record predicates chained over the collection.

mod compare;
mod errors;
mod method;
mod model;
mod value;

pub use compare::{compile, field_value, CompiledFilter};
pub use errors::{FilterError, FilterErrorCode, FilterResult};
pub use method::{CompareFn, FilterMethod, IndexLookup};
pub use model::{EmptyKind, Filter, FilterField, DIRECT_VALUE_FIELD, IMPLICIT_KEY_FIELD};
pub use value::{get_path, is_nested_path, render, SearchValue};
