//! Query planner
//!
//! Turns a request into an immutable plan against one table schema:
//!
//! 1. keep active filters and order them (see `order`)
//! 2. pick the anchor: merged `*key*` range, else the first filter if an
//!    index can serve it, else a full scan
//! 3. compile every other filter into a chained predicate
//! 4. resolve the sort: reuse the anchor's index order when possible,
//!    otherwise sort in memory
//! 5. resolve the page window
//!
//! With no explicit order the plan always orders by the anchor's index, so
//! paging over an index lookup is deterministic.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::filter::{
    compile, is_nested_path, CompiledFilter, Filter, FilterField, IndexLookup, SearchValue,
    IMPLICIT_KEY_FIELD,
};
use crate::request::{QueryRequest, SortDirection};
use crate::schema::{SchemaError, TableSchema};
use crate::store::{Collection, IndexTarget, KeyMatch, RecordPredicate, Source, WhereClause};

use super::classify::{is_compound_head_indexed, is_indexed_filter, is_key_range_filter};
use super::errors::{filter_error, PlannerError, PlannerResult};
use super::order::optimize_apply_order;
use super::pk_range::resolve_key_range;

/// Where the rows of a query come from
#[derive(Debug, Clone)]
pub enum Anchor {
    /// Whole-table scan
    Scan,
    /// Merged implicit primary key filters
    KeyRange {
        /// Resolved matcher
        matcher: KeyMatch,
        /// Number of filters merged into it
        merged: usize,
    },
    /// A single filter served by an index
    Index {
        /// Index the lookup runs against
        target: IndexTarget,
        /// Filter the lookup implements
        filter: Filter,
        /// Keys visited
        matcher: KeyMatch,
    },
}

impl Anchor {
    /// Index whose order the anchor's rows come back in
    pub fn target(&self) -> IndexTarget {
        match self {
            Anchor::Scan | Anchor::KeyRange { .. } => IndexTarget::PrimaryKey,
            Anchor::Index { target, .. } => target.clone(),
        }
    }

    /// Returns true if the anchor can match no row at all
    pub fn is_empty(&self) -> bool {
        match self {
            Anchor::Scan => false,
            Anchor::KeyRange { matcher, .. } | Anchor::Index { matcher, .. } => {
                matcher.is_nothing()
            }
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Scan => write!(f, "FULL_SCAN"),
            Anchor::KeyRange { matcher, merged } => {
                write!(f, "KEY_RANGE :id {} ({} filters)", matcher.describe(), merged)
            }
            Anchor::Index { target, matcher, .. } => {
                write!(f, "INDEX {} {}", target, matcher.describe())
            }
        }
    }
}

/// Value rows are sorted by when the order is applied in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    /// The row's primary key
    PrimaryKey,
    /// A (possibly dotted) field
    Field(FilterField),
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::PrimaryKey => write!(f, ":id"),
            SortKey::Field(field) => write!(f, "{}", field),
        }
    }
}

/// How the result order is produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortStrategy {
    /// Rows come back from the store already in this index's order
    Native(IndexTarget),
    /// Filtered rows are materialized and sorted in memory
    InMemory(SortKey),
}

impl SortStrategy {
    /// Returns true if the collection stays lazy until the page fetch
    pub fn is_native(&self) -> bool {
        matches!(self, SortStrategy::Native(_))
    }
}

/// Page window (0-based skip)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Rows skipped
    pub skip: usize,
    /// Rows returned at most
    pub limit: usize,
}

/// Immutable query plan
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// Table queried
    pub table: String,
    /// Row source
    pub anchor: Anchor,
    /// Predicates chained over the anchor, in application order
    pub predicates: Vec<Arc<CompiledFilter>>,
    /// Sort strategy
    pub sort: SortStrategy,
    /// Sort direction
    pub direction: SortDirection,
    /// Page window
    pub page: Page,
    collection: Collection,
}

impl QueryPlan {
    /// Filtered, ordered collection without the page window
    pub fn collection(&self) -> &Collection {
        &self.collection
    }
}

/// Query planner bound to one table schema
pub struct QueryPlanner<'a> {
    schema: &'a TableSchema,
    config: &'a EngineConfig,
}

impl<'a> QueryPlanner<'a> {
    /// Creates a new planner
    pub fn new(schema: &'a TableSchema, config: &'a EngineConfig) -> Self {
        Self { schema, config }
    }

    /// Plans a request
    pub fn plan(&self, request: &QueryRequest) -> PlannerResult<QueryPlan> {
        let page = self.resolve_page(request)?;

        let active: Vec<&Filter> = request.active_filters().collect();
        for filter in &active {
            self.check_flags(filter)?;
        }
        let ordered = optimize_apply_order(active.iter().copied());
        for (position, filter) in ordered.iter().enumerate() {
            trace!(position, filter = %filter.describe(), "apply order");
        }

        let (anchor, rest) = self.choose_anchor(&ordered)?;

        let mut predicates = Vec::with_capacity(rest.len());
        for filter in rest {
            let compiled =
                compile(filter).map_err(|e| filter_error(filter.field.as_str(), e))?;
            predicates.push(Arc::new(compiled));
        }

        let sort = self.resolve_sort(&anchor, request.order_field());

        let mut collection = match (&anchor, &sort) {
            (Anchor::Scan, SortStrategy::Native(target)) => Collection::order_by(target.clone()),
            (Anchor::Scan, SortStrategy::InMemory(_)) => Collection::table(),
            (Anchor::KeyRange { matcher, .. }, _) => {
                WhereClause::new(IndexTarget::PrimaryKey).matching(matcher.clone())
            }
            (Anchor::Index { target, matcher, .. }, _) => {
                WhereClause::new(target.clone()).matching(matcher.clone())
            }
        };
        for predicate in &predicates {
            let predicate: Arc<dyn RecordPredicate> = predicate.clone();
            collection = collection.filter(predicate);
        }
        if sort.is_native() && request.direction == SortDirection::Desc {
            collection = collection.reverse();
        }

        if anchor.is_empty() {
            warn!(table = %request.tablename, "anchor matches no row");
        }
        debug!(
            table = %request.tablename,
            anchor = %anchor,
            predicates = predicates.len(),
            sort = ?sort,
            skip = page.skip,
            limit = page.limit,
            "query planned"
        );

        Ok(QueryPlan {
            table: request.tablename.clone(),
            anchor,
            predicates,
            sort,
            direction: request.direction,
            page,
            collection,
        })
    }

    fn resolve_page(&self, request: &QueryRequest) -> PlannerResult<Page> {
        let limit = match request.limit {
            Some(0) => return Err(PlannerError::limit_required()),
            Some(n) if n > self.config.max_limit => {
                warn!(requested = n, max = self.config.max_limit, "limit clamped");
                self.config.max_limit
            }
            Some(n) => n,
            None => self.config.default_limit,
        };
        Ok(Page {
            skip: request.offset.max(1) - 1,
            limit,
        })
    }

    /// Index flags must agree with the schema
    fn check_flags(&self, filter: &Filter) -> PlannerResult<()> {
        match &filter.field {
            FilterField::ImplicitKey => Ok(()),
            FilterField::DirectValue if filter.indexed || filter.compound_head => {
                Err(PlannerError::query_invalid(
                    "The direct row value cannot be flagged as indexed",
                ))
            }
            FilterField::DirectValue => Ok(()),
            FilterField::Named(name) => {
                if filter.indexed && self.schema.index_target(name).is_none() {
                    return Err(SchemaError::no_index(name.as_str()).into());
                }
                if filter.compound_head && self.schema.compound_head_target(name).is_none() {
                    return Err(SchemaError::no_compound_head(name.as_str()).into());
                }
                Ok(())
            }
        }
    }

    fn choose_anchor<'f>(
        &self,
        ordered: &[&'f Filter],
    ) -> PlannerResult<(Anchor, Vec<&'f Filter>)> {
        let (key_filters, others): (Vec<&Filter>, Vec<&Filter>) =
            ordered.iter().copied().partition(|f| is_key_range_filter(f));

        if !key_filters.is_empty() {
            let matcher = resolve_key_range(key_filters.iter().copied());
            let anchor = Anchor::KeyRange {
                matcher,
                merged: key_filters.len(),
            };
            return Ok((anchor, others));
        }

        let Some(first) = ordered.first().copied() else {
            return Ok((Anchor::Scan, Vec::new()));
        };
        let Some(target) = self.anchor_target(first)? else {
            return Ok((Anchor::Scan, ordered.to_vec()));
        };
        let Some(matcher) = index_lookup(target.clone(), first) else {
            return Ok((Anchor::Scan, ordered.to_vec()));
        };
        let anchor = Anchor::Index {
            target,
            filter: first.clone(),
            matcher,
        };
        Ok((anchor, ordered[1..].to_vec()))
    }

    fn anchor_target(&self, filter: &Filter) -> PlannerResult<Option<IndexTarget>> {
        let name = match &filter.field {
            FilterField::ImplicitKey => {
                let case_ok = !filter.method.case_sensitive_only() || filter.case_sensitive;
                return Ok((filter.method.lookup().is_some() && case_ok)
                    .then_some(IndexTarget::PrimaryKey));
            }
            FilterField::DirectValue => return Ok(None),
            FilterField::Named(name) => name.as_str(),
        };
        if is_indexed_filter(filter) {
            let target = self
                .schema
                .index_target(name)
                .ok_or_else(|| SchemaError::no_index(name))?;
            return Ok(Some(target));
        }
        if is_compound_head_indexed(filter) {
            let target = self
                .schema
                .compound_head_target(name)
                .ok_or_else(|| SchemaError::no_compound_head(name))?;
            return Ok(Some(target));
        }
        Ok(None)
    }

    /// Index to order by, if the requested order is served by one
    fn order_target(&self, order: &str) -> Option<IndexTarget> {
        if order == IMPLICIT_KEY_FIELD || self.schema.is_primary_key_field(order) {
            return Some(IndexTarget::PrimaryKey);
        }
        if is_nested_path(order) {
            return None;
        }
        self.schema.index_target(order)
    }

    fn resolve_sort(&self, anchor: &Anchor, order: Option<&str>) -> SortStrategy {
        let Some(order) = order else {
            return SortStrategy::Native(anchor.target());
        };
        match self.order_target(order) {
            Some(target) if matches!(anchor, Anchor::Scan) || anchor.target() == target => {
                SortStrategy::Native(target)
            }
            Some(IndexTarget::PrimaryKey) => SortStrategy::InMemory(SortKey::PrimaryKey),
            _ => SortStrategy::InMemory(SortKey::Field(FilterField::parse(order))),
        }
    }
}

/// Builds the storage lookup for a filter on an index
fn index_lookup(target: IndexTarget, filter: &Filter) -> Option<KeyMatch> {
    let search = SearchValue::parse(&filter.search);
    let clause = WhereClause::new(target);
    let collection = match filter.method.lookup()? {
        IndexLookup::Equals if filter.case_sensitive => clause.any_of(search.candidates()),
        IndexLookup::Equals => clause.equals_ignore_case(filter.search.as_str()),
        IndexLookup::NotEqual => clause.none_of(search.candidates()),
        IndexLookup::Below if filter.include_bounds => clause.below_or_equal(search.key()),
        IndexLookup::Below => clause.below(search.key()),
        IndexLookup::Above if filter.include_bounds => clause.above_or_equal(search.key()),
        IndexLookup::Above => clause.above(search.key()),
        IndexLookup::StartsWith if filter.case_sensitive => {
            clause.starts_with(filter.search.as_str())
        }
        IndexLookup::StartsWith => clause.starts_with_ignore_case(filter.search.as_str()),
    };
    match collection.source() {
        Source::Where { matcher, .. } => Some(matcher.clone()),
        _ => None,
    }
}
