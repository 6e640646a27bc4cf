//! Filter data model

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::method::FilterMethod;

/// Sentinel field name of the implicit primary key
pub const IMPLICIT_KEY_FIELD: &str = "*key*";

/// Sentinel field name of a row's sole direct value
pub const DIRECT_VALUE_FIELD: &str = "*value*";

/// The column a filter targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterField {
    /// A named (possibly dotted) field of an object row
    Named(String),
    /// The implicit, unnamed primary key
    ImplicitKey,
    /// The row itself, for tables whose rows are not objects
    DirectValue,
}

impl FilterField {
    /// Creates a field from its wire name
    pub fn parse(name: &str) -> Self {
        match name {
            IMPLICIT_KEY_FIELD => FilterField::ImplicitKey,
            DIRECT_VALUE_FIELD => FilterField::DirectValue,
            other => FilterField::Named(other.to_string()),
        }
    }

    /// Wire name
    pub fn as_str(&self) -> &str {
        match self {
            FilterField::Named(name) => name,
            FilterField::ImplicitKey => IMPLICIT_KEY_FIELD,
            FilterField::DirectValue => DIRECT_VALUE_FIELD,
        }
    }

    /// True for the implicit primary key
    pub fn is_implicit_key(&self) -> bool {
        matches!(self, FilterField::ImplicitKey)
    }
}

impl From<String> for FilterField {
    fn from(name: String) -> Self {
        FilterField::parse(&name)
    }
}

impl From<FilterField> for String {
    fn from(field: FilterField) -> Self {
        field.as_str().to_string()
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kinds of value the `empty` method treats as empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyKind {
    /// Field absent
    Undefined,
    /// Field is null
    Null,
    /// Empty string
    String,
    /// Empty array
    Array,
    /// Object with no keys
    Object,
}

fn default_true() -> bool {
    true
}

/// A single per-field filter predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    /// Target column
    pub field: FilterField,
    /// Search text (`""` disables the filter; `yes`/`no` for `empty`)
    #[serde(default)]
    pub search: String,
    /// Method
    pub method: FilterMethod,
    /// Case-sensitive comparison
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    /// below/above include the bound itself
    #[serde(default)]
    pub include_bounds: bool,
    /// Kinds considered empty by the `empty` method
    #[serde(default)]
    pub empty: BTreeSet<EmptyKind>,
    /// Column is backed by a secondary index (or is the primary key)
    #[serde(default)]
    pub indexed: bool,
    /// Column leads a compound index
    #[serde(default)]
    pub compound_head: bool,
    /// Filter passed UI validation
    #[serde(default = "default_true")]
    pub valid: bool,
}

impl Filter {
    /// Creates a case-sensitive, valid filter
    pub fn new(field: impl Into<String>, method: FilterMethod, search: impl Into<String>) -> Self {
        Self {
            field: FilterField::parse(&field.into()),
            search: search.into(),
            method,
            case_sensitive: true,
            include_bounds: false,
            empty: BTreeSet::new(),
            indexed: false,
            compound_head: false,
            valid: true,
        }
    }

    /// Filter on the implicit primary key
    pub fn on_key(method: FilterMethod, search: impl Into<String>) -> Self {
        Self::new(IMPLICIT_KEY_FIELD, method, search)
    }

    /// Marks the column as indexed
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Marks the column as leading a compound index
    pub fn compound_head(mut self) -> Self {
        self.compound_head = true;
        self
    }

    /// Compares case-insensitively
    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    /// Makes below/above inclusive
    pub fn include_bounds(mut self) -> Self {
        self.include_bounds = true;
        self
    }

    /// Sets the empty kinds
    pub fn with_empty(mut self, kinds: impl IntoIterator<Item = EmptyKind>) -> Self {
        self.empty = kinds.into_iter().collect();
        self
    }

    /// Marks the filter invalid
    pub fn invalid(mut self) -> Self {
        self.valid = false;
        self
    }

    /// Active filters take part in a query: non-empty search and valid
    pub fn is_active(&self) -> bool {
        !self.search.is_empty()
            && self.valid
            && (self.method != FilterMethod::Empty || !self.empty.is_empty())
    }

    /// Short human-readable form, e.g. `age < 30`
    pub fn describe(&self) -> String {
        let mut out = format!("{} {} {:?}", self.field, self.method.short_label(), self.search);
        if self.method.uses_bounds() && self.include_bounds {
            out.push_str(" (inclusive)");
        }
        if !self.case_sensitive {
            out.push_str(" (ignore case)");
        }
        out
    }
}
