//! Query request shape
//!
//! A request is built per query, read-only during evaluation and dropped
//! once the response is produced.

use serde::{Deserialize, Serialize};

use crate::filter::Filter;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl SortDirection {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

fn default_offset() -> usize {
    1
}

/// A page query over one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Database name (informational)
    #[serde(default)]
    pub dbname: String,
    /// Table to query
    #[serde(default)]
    pub tablename: String,
    /// Filters, in caller order
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Field to order by; absent or empty means no explicit order
    #[serde(default)]
    pub order: Option<String>,
    /// Sort direction
    #[serde(default)]
    pub direction: SortDirection,
    /// Inject `*key*` into rows of unnamed-key tables
    #[serde(default)]
    pub add_unnamed_pk: bool,
    /// 1-based index of the first row of the page
    #[serde(default = "default_offset")]
    pub offset: usize,
    /// Page size; the configured default applies when absent
    #[serde(default)]
    pub limit: Option<usize>,
}

impl QueryRequest {
    /// Request for the first page of a table, no filters, no order
    pub fn new(tablename: impl Into<String>) -> Self {
        Self {
            dbname: String::new(),
            tablename: tablename.into(),
            filters: Vec::new(),
            order: None,
            direction: SortDirection::Asc,
            add_unnamed_pk: false,
            offset: 1,
            limit: None,
        }
    }

    /// Adds a filter
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sets the order
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order = Some(field.into());
        self.direction = direction;
        self
    }

    /// Sets the page window
    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// Requests `*key*` injection
    pub fn with_unnamed_pk(mut self) -> Self {
        self.add_unnamed_pk = true;
        self
    }

    /// Explicitly requested order field, if any
    pub fn order_field(&self) -> Option<&str> {
        self.order.as_deref().filter(|o| !o.is_empty())
    }

    /// Filters that take part in the query
    pub fn active_filters(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter().filter(|f| f.is_active())
    }
}
