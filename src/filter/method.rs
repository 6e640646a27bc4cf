//! Filter methods
//!
//! Each method owns a display glyph, an optional storage lookup (only
//! methods with native ordered-index semantics), and a comparison function
//! over a stored value and the typed search value. `empty` and `regexp`
//! have no static comparison; theirs is built from the filter's state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::FilterError;
use super::value::{render, SearchValue};
use crate::store::IndexKey;

/// Comparison of a stored value against the search value
pub type CompareFn = fn(&Value, &SearchValue) -> bool;

/// Filter method vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMethod {
    Equal,
    NotEqual,
    Below,
    Above,
    StartsWith,
    EndsWith,
    Contains,
    Empty,
    Regexp,
}

/// Storage-level lookup a method maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexLookup {
    Equals,
    NotEqual,
    Below,
    Above,
    StartsWith,
}

/// Index application priority, most selective first
const INDEXED_PRIORITY: [FilterMethod; 5] = [
    FilterMethod::Equal,
    FilterMethod::StartsWith,
    FilterMethod::Below,
    FilterMethod::Above,
    FilterMethod::NotEqual,
];

impl FilterMethod {
    /// All methods, in display order
    pub const ALL: [FilterMethod; 9] = [
        FilterMethod::Equal,
        FilterMethod::NotEqual,
        FilterMethod::Below,
        FilterMethod::Above,
        FilterMethod::StartsWith,
        FilterMethod::EndsWith,
        FilterMethod::Contains,
        FilterMethod::Empty,
        FilterMethod::Regexp,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMethod::Equal => "equal",
            FilterMethod::NotEqual => "notequal",
            FilterMethod::Below => "below",
            FilterMethod::Above => "above",
            FilterMethod::StartsWith => "startswith",
            FilterMethod::EndsWith => "endswith",
            FilterMethod::Contains => "contains",
            FilterMethod::Empty => "empty",
            FilterMethod::Regexp => "regexp",
        }
    }

    /// Short display glyph
    pub fn short_label(&self) -> &'static str {
        match self {
            FilterMethod::Equal => "=",
            FilterMethod::NotEqual => "≠",
            FilterMethod::Below => "<",
            FilterMethod::Above => ">",
            FilterMethod::StartsWith => "a…",
            FilterMethod::EndsWith => "…a",
            FilterMethod::Contains => "…a…",
            FilterMethod::Empty => "∅",
            FilterMethod::Regexp => ".*",
        }
    }

    /// Storage lookup, for methods an ordered index can serve
    pub fn lookup(&self) -> Option<IndexLookup> {
        match self {
            FilterMethod::Equal => Some(IndexLookup::Equals),
            FilterMethod::NotEqual => Some(IndexLookup::NotEqual),
            FilterMethod::Below => Some(IndexLookup::Below),
            FilterMethod::Above => Some(IndexLookup::Above),
            FilterMethod::StartsWith => Some(IndexLookup::StartsWith),
            FilterMethod::EndsWith
            | FilterMethod::Contains
            | FilterMethod::Empty
            | FilterMethod::Regexp => None,
        }
    }

    /// Methods the storage can only look up case-sensitively
    pub fn case_sensitive_only(&self) -> bool {
        matches!(
            self,
            FilterMethod::NotEqual | FilterMethod::Below | FilterMethod::Above
        )
    }

    /// Methods usable as a prefix query on the leading field of a compound index
    pub fn is_compound_prefix(&self) -> bool {
        matches!(
            self,
            FilterMethod::Equal | FilterMethod::NotEqual | FilterMethod::StartsWith
        )
    }

    /// Only below/above honour `includeBounds`
    pub fn uses_bounds(&self) -> bool {
        matches!(self, FilterMethod::Below | FilterMethod::Above)
    }

    /// Position in the indexed priority list; unlisted methods go last
    pub fn index_priority(&self) -> usize {
        INDEXED_PRIORITY
            .iter()
            .position(|m| m == self)
            .unwrap_or(INDEXED_PRIORITY.len())
    }

    /// Static comparison function, `None` for `empty` and `regexp`
    pub fn comparison(&self, include_bounds: bool) -> Option<CompareFn> {
        let f: CompareFn = match self {
            FilterMethod::Equal => equal,
            FilterMethod::NotEqual => not_equal,
            FilterMethod::Below if include_bounds => below_or_equal,
            FilterMethod::Below => below,
            FilterMethod::Above if include_bounds => above_or_equal,
            FilterMethod::Above => above,
            FilterMethod::StartsWith => starts_with,
            FilterMethod::EndsWith => ends_with,
            FilterMethod::Contains => contains,
            FilterMethod::Empty | FilterMethod::Regexp => return None,
        };
        Some(f)
    }
}

impl fmt::Display for FilterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FilterMethod {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterMethod::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| FilterError::unknown_method(s))
    }
}

fn equal(stored: &Value, search: &SearchValue) -> bool {
    match IndexKey::from_json(stored) {
        Some(key) => search.matches_key(&key),
        None => render(stored) == search.text(),
    }
}

fn not_equal(stored: &Value, search: &SearchValue) -> bool {
    !equal(stored, search)
}

fn below(stored: &Value, search: &SearchValue) -> bool {
    IndexKey::from_json(stored).is_some_and(|k| k < search.key())
}

fn below_or_equal(stored: &Value, search: &SearchValue) -> bool {
    IndexKey::from_json(stored).is_some_and(|k| k <= search.key())
}

fn above(stored: &Value, search: &SearchValue) -> bool {
    IndexKey::from_json(stored).is_some_and(|k| k > search.key())
}

fn above_or_equal(stored: &Value, search: &SearchValue) -> bool {
    IndexKey::from_json(stored).is_some_and(|k| k >= search.key())
}

fn starts_with(stored: &Value, search: &SearchValue) -> bool {
    render(stored).starts_with(search.text())
}

fn ends_with(stored: &Value, search: &SearchValue) -> bool {
    render(stored).ends_with(search.text())
}

fn contains(stored: &Value, search: &SearchValue) -> bool {
    render(stored).contains(search.text())
}
