//! Query planner subsystem
//!
//! Produces deterministic plans: the same schema and request always give
//! the same plan.
//!
//! # Anchor selection
//!
//! 1. Filters on the implicit primary key, merged into one key range
//! 2. The first filter in apply order, if a true index or the head of a
//!    compound index can serve it
//! 3. A full table scan
//!
//! Every other filter is chained as an in-memory predicate.

mod classify;
mod errors;
mod explain;
mod order;
mod pk_range;
mod planner;

pub use classify::{is_compound_head_indexed, is_indexed_filter, is_key_range_filter};
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult, Severity};
pub use explain::ExplainPlan;
pub use order::optimize_apply_order;
pub use pk_range::resolve_key_range;
pub use planner::{Anchor, Page, QueryPlan, QueryPlanner, SortKey, SortStrategy};
