//! Table schema definitions
//!
//! A table has one primary key and any number of secondary indexes.
//! Primary keys come in three shapes:
//! - named: an inline key path (`id`)
//! - unnamed: an out-of-line auto-incremented key, addressed as `:id`
//! - compound: an ordered list of inline key paths

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::store::IndexTarget;

use super::errors::{SchemaError, SchemaResult};

/// Synthetic name of the unnamed primary key
pub const UNNAMED_KEY_INDEX: &str = ":id";

/// Primary key shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PrimaryKey {
    /// Inline key stored under a field
    Named {
        /// Key path of the key field
        name: String,
    },
    /// Out-of-line surrogate key
    Unnamed,
    /// Inline key made of several fields
    Compound {
        /// Key paths, in key order
        fields: Vec<String>,
    },
}

impl PrimaryKey {
    /// Creates a named primary key
    pub fn named(name: impl Into<String>) -> Self {
        PrimaryKey::Named { name: name.into() }
    }

    /// Creates a compound primary key
    pub fn compound(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        PrimaryKey::Compound {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true for the out-of-line surrogate key
    pub fn is_unnamed(&self) -> bool {
        matches!(self, PrimaryKey::Unnamed)
    }

    /// Display name (`:id` for unnamed keys, `[a+b]` for compound keys)
    pub fn display_name(&self) -> String {
        match self {
            PrimaryKey::Named { name } => name.clone(),
            PrimaryKey::Unnamed => UNNAMED_KEY_INDEX.to_string(),
            PrimaryKey::Compound { fields } => format!("[{}]", fields.join("+")),
        }
    }
}

/// Secondary index definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name
    pub name: String,
    /// Key paths covered; empty means the single path `name`
    #[serde(default, rename = "keyPath")]
    pub key_path: Vec<String>,
}

impl IndexSpec {
    /// Single-field index named after its field
    pub fn single(field: impl Into<String>) -> Self {
        Self {
            name: field.into(),
            key_path: Vec::new(),
        }
    }

    /// Compound index over several fields, named `[a+b]`
    pub fn compound(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let key_path: Vec<String> = fields.into_iter().map(Into::into).collect();
        Self {
            name: format!("[{}]", key_path.join("+")),
            key_path,
        }
    }

    /// Key paths this index reads, in order
    pub fn fields(&self) -> Vec<&str> {
        if self.key_path.is_empty() {
            vec![self.name.as_str()]
        } else {
            self.key_path.iter().map(String::as_str).collect()
        }
    }

    /// True if the index covers more than one field
    pub fn is_compound(&self) -> bool {
        self.key_path.len() > 1
    }

    /// First field of the index
    pub fn leading_field(&self) -> &str {
        self.key_path.first().map(String::as_str).unwrap_or(&self.name)
    }
}

/// Table schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Primary key shape
    #[serde(rename = "primKey")]
    pub primary_key: PrimaryKey,
    /// Secondary indexes
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

impl TableSchema {
    /// Schema with a named primary key and no indexes
    pub fn named(pk: impl Into<String>) -> Self {
        Self {
            primary_key: PrimaryKey::named(pk),
            indexes: Vec::new(),
        }
    }

    /// Schema with an unnamed primary key and no indexes
    pub fn unnamed() -> Self {
        Self {
            primary_key: PrimaryKey::Unnamed,
            indexes: Vec::new(),
        }
    }

    /// Schema with a compound primary key and no indexes
    pub fn compound(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            primary_key: PrimaryKey::compound(fields),
            indexes: Vec::new(),
        }
    }

    /// Adds a secondary index
    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    /// Looks up an index by name
    pub fn index(&self, name: &str) -> Option<&IndexSpec> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// True if `field` names the primary key, or its synthetic alias
    pub fn is_primary_key_field(&self, field: &str) -> bool {
        match &self.primary_key {
            PrimaryKey::Named { name } => name == field,
            PrimaryKey::Unnamed => field == UNNAMED_KEY_INDEX,
            PrimaryKey::Compound { .. } => field == self.primary_key.display_name(),
        }
    }

    /// Resolves a field to a true index: the primary key or a single-field index.
    pub fn index_target(&self, field: &str) -> Option<IndexTarget> {
        if self.is_primary_key_field(field) {
            return Some(IndexTarget::PrimaryKey);
        }
        self.indexes
            .iter()
            .find(|i| !i.is_compound() && i.leading_field() == field)
            .map(|i| IndexTarget::Index(i.name.clone()))
    }

    /// Resolves a field to a compound index it leads
    pub fn compound_head_target(&self, field: &str) -> Option<IndexTarget> {
        self.indexes
            .iter()
            .find(|i| i.is_compound() && i.leading_field() == field)
            .map(|i| IndexTarget::CompoundHead(i.name.clone()))
    }

    /// Validates the schema.
    ///
    /// - index names are unique
    /// - compound keys list at least two fields
    /// - key paths are non-empty
    pub fn validate(&self) -> SchemaResult<()> {
        match &self.primary_key {
            PrimaryKey::Named { name } if name.is_empty() => {
                return Err(SchemaError::invalid("Primary key name must not be empty"));
            }
            PrimaryKey::Compound { fields } if fields.len() < 2 => {
                return Err(SchemaError::invalid(
                    "Compound primary key needs at least two fields",
                ));
            }
            _ => {}
        }

        let mut seen = HashSet::new();
        for index in &self.indexes {
            if index.name.is_empty() {
                return Err(SchemaError::invalid("Index name must not be empty"));
            }
            if !seen.insert(index.name.as_str()) {
                return Err(SchemaError::invalid(format!(
                    "Duplicate index '{}'",
                    index.name
                )));
            }
            if index.key_path.len() == 1 && index.key_path[0] != index.name {
                return Err(SchemaError::invalid(format!(
                    "Single-field index '{}' must be named after its field",
                    index.name
                )));
            }
            if index.key_path.iter().any(String::is_empty) {
                return Err(SchemaError::invalid(format!(
                    "Index '{}' has an empty key path",
                    index.name
                )));
            }
        }
        Ok(())
    }
}
