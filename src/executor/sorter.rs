//! In-memory result sorting
//!
//! Used when the requested order cannot reuse the anchor's index order.
//! Sort values compare exactly like index keys, so an in-memory sort agrees
//! with a native one. Rows whose sort value is missing or is not a valid
//! key (null, bool, object) go last in both directions, keeping their
//! input order, the same place an index walk puts rows it has no entry
//! for. The sort is stable.

use std::cmp::Ordering;

use crate::filter::field_value;
use crate::planner::SortKey;
use crate::request::SortDirection;
use crate::store::{IndexKey, Record};

/// Sorts materialized records
pub struct ResultSorter;

impl ResultSorter {
    /// Sorts records by a key, stable
    pub fn sort(records: &mut [Record], key: &SortKey, direction: SortDirection) {
        records.sort_by_cached_key(|record| {
            let value = sort_value(record, key);
            SortEntry { value, direction }
        });
    }
}

fn sort_value(record: &Record, key: &SortKey) -> Option<IndexKey> {
    match key {
        SortKey::PrimaryKey => Some(record.primary_key.clone()),
        SortKey::Field(field) => field_value(field, record).and_then(|v| IndexKey::from_json(&v)),
    }
}

#[derive(PartialEq, Eq)]
struct SortEntry {
    value: Option<IndexKey>,
    direction: SortDirection,
}

impl Ord for SortEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.value, &other.value) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => match self.direction {
                SortDirection::Asc => a.cmp(b),
                SortDirection::Desc => b.cmp(a),
            },
        }
    }
}

impl PartialOrd for SortEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
