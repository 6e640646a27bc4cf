//! Lazy collections and where-clauses
//!
//! A `Collection` describes a read without performing it: where rows come
//! from (whole table, an index in order, or an index lookup), which
//! predicates are chained over them, the direction, and the page window.
//! A `TableStore` executes it.

use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

use serde_json::Value;

use crate::cancel::CancellationToken;
use crate::schema::TableSchema;

use super::errors::StoreResult;
use super::key::IndexKey;
use super::range::{normalize_ranges, KeyMatch, KeyRange};

/// A stored row together with its primary key
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Primary key (inline or out-of-line)
    pub primary_key: IndexKey,
    /// Stored value
    pub value: Value,
}

impl Record {
    /// Creates a record
    pub fn new(primary_key: IndexKey, value: Value) -> Self {
        Self { primary_key, value }
    }
}

/// The ordered structure a lookup runs against
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexTarget {
    /// The primary key (named, compound, or the synthetic `:id` of unnamed keys)
    PrimaryKey,
    /// A single-field secondary index, by index name
    Index(String),
    /// The leading field of a compound index, by index name
    CompoundHead(String),
}

impl fmt::Display for IndexTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexTarget::PrimaryKey => write!(f, ":id"),
            IndexTarget::Index(name) => write!(f, "{}", name),
            IndexTarget::CompoundHead(name) => write!(f, "{} (head)", name),
        }
    }
}

/// Predicate chained over a collection with `Collection::filter`
pub trait RecordPredicate: fmt::Debug + Send + Sync {
    /// Returns true if the record passes
    fn test(&self, record: &Record) -> bool;
}

/// Where rows of a collection come from
#[derive(Debug, Clone)]
pub enum Source {
    /// Whole table in primary key order
    Table,
    /// Every entry of an index, in index order
    OrderBy(IndexTarget),
    /// Entries of an index visited by a matcher, in index order
    Where {
        /// Index the lookup runs against
        target: IndexTarget,
        /// Keys visited
        matcher: KeyMatch,
    },
}

/// Lazy, chainable read description
#[derive(Debug, Clone)]
pub struct Collection {
    source: Source,
    filters: Vec<Arc<dyn RecordPredicate>>,
    reverse: bool,
    offset: usize,
    limit: Option<usize>,
}

impl Collection {
    fn from_source(source: Source) -> Self {
        Self {
            source,
            filters: Vec::new(),
            reverse: false,
            offset: 0,
            limit: None,
        }
    }

    /// Every row, in primary key order
    pub fn table() -> Self {
        Self::from_source(Source::Table)
    }

    /// Every row present in an index, in that index's order
    pub fn order_by(target: IndexTarget) -> Self {
        match target {
            IndexTarget::PrimaryKey => Self::table(),
            other => Self::from_source(Source::OrderBy(other)),
        }
    }

    /// Chains a predicate
    pub fn filter(mut self, predicate: Arc<dyn RecordPredicate>) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Flips the direction
    pub fn reverse(mut self) -> Self {
        self.reverse = !self.reverse;
        self
    }

    /// Skips `n` rows after filtering
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = n;
        self
    }

    /// Caps the number of rows returned
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Returns the row source
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Returns the chained predicates
    pub fn filters(&self) -> &[Arc<dyn RecordPredicate>] {
        &self.filters
    }

    /// Returns true if rows come back in descending order
    pub fn is_reversed(&self) -> bool {
        self.reverse
    }

    /// Returns the number of rows skipped
    pub fn skip(&self) -> usize {
        self.offset
    }

    /// Returns the row cap
    pub fn cap(&self) -> Option<usize> {
        self.limit
    }

    /// Returns true if every chained predicate accepts the record
    pub fn accepts(&self, record: &Record) -> bool {
        self.filters.iter().all(|p| p.test(record))
    }
}

/// Where-clause builder: `WhereClause::new(target).below(key)`
#[derive(Debug, Clone)]
pub struct WhereClause {
    target: IndexTarget,
}

impl WhereClause {
    /// Starts a where-clause on an index
    pub fn new(target: IndexTarget) -> Self {
        Self { target }
    }

    fn collection(self, matcher: KeyMatch) -> Collection {
        Collection::from_source(Source::Where {
            target: self.target,
            matcher,
        })
    }

    /// Wraps a precomputed matcher
    pub fn matching(self, matcher: KeyMatch) -> Collection {
        self.collection(matcher)
    }

    /// key == value
    pub fn equals(self, key: IndexKey) -> Collection {
        self.any_of(vec![key])
    }

    /// rendering(key) == text, ignoring case
    pub fn equals_ignore_case(self, text: impl Into<String>) -> Collection {
        self.collection(KeyMatch::EqualsIgnoreCase(text.into()))
    }

    /// key < value
    pub fn below(self, key: IndexKey) -> Collection {
        self.in_any_range(vec![KeyRange::new(Bound::Unbounded, Bound::Excluded(key))])
    }

    /// key <= value
    pub fn below_or_equal(self, key: IndexKey) -> Collection {
        self.in_any_range(vec![KeyRange::new(Bound::Unbounded, Bound::Included(key))])
    }

    /// key > value
    pub fn above(self, key: IndexKey) -> Collection {
        self.in_any_range(vec![KeyRange::new(Bound::Excluded(key), Bound::Unbounded)])
    }

    /// key >= value
    pub fn above_or_equal(self, key: IndexKey) -> Collection {
        self.in_any_range(vec![KeyRange::new(Bound::Included(key), Bound::Unbounded)])
    }

    /// key != value
    pub fn not_equal(self, key: IndexKey) -> Collection {
        self.none_of(vec![key])
    }

    /// key not in the given set
    pub fn none_of(self, mut keys: Vec<IndexKey>) -> Collection {
        keys.sort();
        keys.dedup();
        let mut ranges = Vec::with_capacity(keys.len() + 1);
        let mut lower = Bound::Unbounded;
        for key in keys {
            ranges.push(KeyRange::new(lower, Bound::Excluded(key.clone())));
            lower = Bound::Excluded(key);
        }
        ranges.push(KeyRange::new(lower, Bound::Unbounded));
        self.in_any_range(ranges)
    }

    /// String keys beginning with the prefix
    pub fn starts_with(self, prefix: impl Into<String>) -> Collection {
        self.collection(KeyMatch::StartsWith(prefix.into()))
    }

    /// Keys whose rendering begins with the prefix, ignoring case
    pub fn starts_with_ignore_case(self, prefix: impl Into<String>) -> Collection {
        self.collection(KeyMatch::StartsWithIgnoreCase(prefix.into()))
    }

    /// lower..upper with explicit inclusivity
    pub fn between(
        self,
        lower: IndexKey,
        upper: IndexKey,
        include_lower: bool,
        include_upper: bool,
    ) -> Collection {
        let lower = if include_lower {
            Bound::Included(lower)
        } else {
            Bound::Excluded(lower)
        };
        let upper = if include_upper {
            Bound::Included(upper)
        } else {
            Bound::Excluded(upper)
        };
        self.in_any_range(vec![KeyRange::new(lower, upper)])
    }

    /// Keys inside any of the ranges
    pub fn in_any_range(self, ranges: Vec<KeyRange>) -> Collection {
        let ranges = normalize_ranges(ranges);
        if ranges.is_empty() {
            return self.collection(KeyMatch::Nothing);
        }
        self.collection(KeyMatch::Ranges(ranges))
    }

    /// Keys equal to any listed key
    pub fn any_of(self, mut keys: Vec<IndexKey>) -> Collection {
        keys.sort();
        keys.dedup();
        if keys.is_empty() {
            return self.collection(KeyMatch::Nothing);
        }
        self.collection(KeyMatch::AnyOf(keys))
    }
}

/// A single table of a key-value store, as seen by the query engine.
///
/// Implementations run one read per call; the engine never writes.
pub trait TableStore {
    /// Table name
    fn name(&self) -> &str;

    /// Primary key shape and secondary indexes
    fn schema(&self) -> &TableSchema;

    /// Number of rows in the table
    fn count_all(&self) -> StoreResult<usize>;

    /// Materializes a collection (offset and limit applied)
    fn fetch(&self, collection: &Collection, cancel: &CancellationToken)
        -> StoreResult<Vec<Record>>;

    /// Counts a collection (offset and limit applied)
    fn count(&self, collection: &Collection, cancel: &CancellationToken) -> StoreResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: i64) -> IndexKey {
        IndexKey::from_i64(v)
    }

    fn matcher(collection: &Collection) -> &KeyMatch {
        match collection.source() {
            Source::Where { matcher, .. } => matcher,
            other => panic!("expected where source, got {:?}", other),
        }
    }

    #[test]
    fn test_not_equal_punctures() {
        let c = WhereClause::new(IndexTarget::PrimaryKey).not_equal(n(5));
        let m = matcher(&c);
        assert!(m.matches(&n(4)));
        assert!(!m.matches(&n(5)));
        assert!(m.matches(&n(6)));
        assert!(m.matches(&IndexKey::from_string("5")));
    }

    #[test]
    fn test_none_of_several() {
        let c = WhereClause::new(IndexTarget::PrimaryKey)
            .none_of(vec![n(5), IndexKey::from_string("5")]);
        let m = matcher(&c);
        assert!(!m.matches(&n(5)));
        assert!(!m.matches(&IndexKey::from_string("5")));
        assert!(m.matches(&IndexKey::from_string("6")));
    }

    #[test]
    fn test_between_exclusive() {
        let c = WhereClause::new(IndexTarget::PrimaryKey).between(n(1), n(3), false, true);
        let m = matcher(&c);
        assert!(!m.matches(&n(1)));
        assert!(m.matches(&n(3)));
    }

    #[test]
    fn test_empty_inputs_match_nothing() {
        let c = WhereClause::new(IndexTarget::PrimaryKey).any_of(vec![]);
        assert_eq!(matcher(&c), &KeyMatch::Nothing);

        let c = WhereClause::new(IndexTarget::PrimaryKey).between(n(3), n(1), true, true);
        assert_eq!(matcher(&c), &KeyMatch::Nothing);
    }

    #[test]
    fn test_order_by_primary_key_is_table() {
        assert!(matches!(
            Collection::order_by(IndexTarget::PrimaryKey).source(),
            Source::Table
        ));
    }

    #[test]
    fn test_reverse_toggles() {
        let c = Collection::table().reverse();
        assert!(c.is_reversed());
        assert!(!c.reverse().is_reversed());
    }
}
