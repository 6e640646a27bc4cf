//! Row selection
//!
//! A UI selection is a set of positions in the current page, either listed
//! explicitly or as "all rows except these". `RowSelector` derives a stable
//! identifier for each row from the table's primary key shape, so a
//! selection can be turned into primary key lookup keys.
//!
//! Rows of unnamed-key tables carry their key only when the page was fetched
//! with `addUnnamedPk`.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::{get_path, IMPLICIT_KEY_FIELD};
use crate::schema::{PrimaryKey, TableSchema};
use crate::store::IndexKey;

/// Selection error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionErrorCode {
    /// A selected row carries no usable identifier
    NoKey,
    /// A position lies outside the page
    OutOfRange,
}

impl SelectionErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SelectionErrorCode::NoKey => "SCOPE_SELECTION_NO_KEY",
            SelectionErrorCode::OutOfRange => "SCOPE_SELECTION_OUT_OF_RANGE",
        }
    }
}

/// Selection error with context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionError {
    code: SelectionErrorCode,
    message: String,
}

impl SelectionError {
    fn no_key(position: usize, selector: &RowSelector) -> Self {
        let hint = if matches!(selector, RowSelector::Unnamed) {
            " (fetch the page with addUnnamedPk)"
        } else {
            ""
        };
        Self {
            code: SelectionErrorCode::NoKey,
            message: format!(
                "Row {} has no value for key {}{}",
                position, selector, hint
            ),
        }
    }

    fn out_of_range(position: usize, len: usize) -> Self {
        Self {
            code: SelectionErrorCode::OutOfRange,
            message: format!("Position {} is outside a page of {} rows", position, len),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SelectionErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REJECT] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for SelectionError {}

/// Result type for selection operations
pub type SelectionResult<T> = Result<T, SelectionError>;

/// Derives row identifiers from the primary key shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSelector {
    /// Inline key under one field
    Named(String),
    /// Out-of-line key, read from the injected `*key*` field
    Unnamed,
    /// Inline key made of several fields
    Compound(Vec<String>),
}

impl RowSelector {
    /// Selector for a table schema
    pub fn for_schema(schema: &TableSchema) -> Self {
        match &schema.primary_key {
            PrimaryKey::Named { name } => RowSelector::Named(name.clone()),
            PrimaryKey::Unnamed => RowSelector::Unnamed,
            PrimaryKey::Compound { fields } => RowSelector::Compound(fields.clone()),
        }
    }

    /// Primary key of a response row
    pub fn row_key(&self, row: &Value) -> Option<IndexKey> {
        match self {
            RowSelector::Named(name) => get_path(row, name).and_then(IndexKey::from_json),
            RowSelector::Unnamed => row.get(IMPLICIT_KEY_FIELD).and_then(IndexKey::from_json),
            RowSelector::Compound(fields) => fields
                .iter()
                .map(|f| get_path(row, f).and_then(IndexKey::from_json))
                .collect::<Option<Vec<_>>>()
                .map(IndexKey::from_parts),
        }
    }

    /// Stable string identifier of a response row
    pub fn row_id(&self, row: &Value) -> Option<String> {
        self.row_key(row).map(|k| k.to_json().to_string())
    }
}

impl fmt::Display for RowSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowSelector::Named(name) => write!(f, "{}", name),
            RowSelector::Unnamed => write!(f, "{}", IMPLICIT_KEY_FIELD),
            RowSelector::Compound(fields) => write!(f, "[{}]", fields.join("+")),
        }
    }
}

/// Selected rows of a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "positions", rename_all = "camelCase")]
pub enum Selection {
    /// Exactly these positions
    Rows(BTreeSet<usize>),
    /// Every position except these
    AllExcept(BTreeSet<usize>),
}

impl Selection {
    /// Selects nothing
    pub fn none() -> Self {
        Selection::Rows(BTreeSet::new())
    }

    /// Selects every row
    pub fn all() -> Self {
        Selection::AllExcept(BTreeSet::new())
    }

    /// Selected positions of a page of `len` rows, ascending
    pub fn positions(&self, len: usize) -> SelectionResult<Vec<usize>> {
        match self {
            Selection::Rows(rows) => {
                if let Some(&bad) = rows.iter().find(|&&p| p >= len) {
                    return Err(SelectionError::out_of_range(bad, len));
                }
                Ok(rows.iter().copied().collect())
            }
            Selection::AllExcept(excluded) => {
                Ok((0..len).filter(|p| !excluded.contains(p)).collect())
            }
        }
    }

    /// Primary keys of the selected rows, in page order
    pub fn keys(&self, selector: &RowSelector, rows: &[Value]) -> SelectionResult<Vec<IndexKey>> {
        self.positions(rows.len())?
            .into_iter()
            .map(|p| {
                selector
                    .row_key(&rows[p])
                    .ok_or_else(|| SelectionError::no_key(p, selector))
            })
            .collect()
    }
}
