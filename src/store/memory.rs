//! In-memory table store
//!
//! Rows live in a `BTreeMap` keyed by primary key. Every secondary index is
//! an `IndexTree` mapping index keys to the sorted primary keys of the rows
//! holding them, so iteration order is deterministic: index key first,
//! primary key second. Rows whose indexed field is not a valid key are
//! absent from that index; ordering by it visits them last.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::filter::get_path;
use crate::schema::{IndexSpec, PrimaryKey, TableSchema};

use super::collection::{Collection, IndexTarget, Record, Source, TableStore};
use super::errors::{StoreError, StoreResult};
use super::key::IndexKey;
use super::range::KeyMatch;

/// A secondary index: index key -> primary keys, both sorted
#[derive(Debug, Default)]
struct IndexTree {
    tree: BTreeMap<IndexKey, Vec<IndexKey>>,
}

impl IndexTree {
    fn insert(&mut self, key: IndexKey, primary_key: IndexKey) {
        let keys = self.tree.entry(key).or_default();
        match keys.binary_search(&primary_key) {
            Ok(_) => {}
            Err(pos) => keys.insert(pos, primary_key),
        }
    }

    fn entry_count(&self) -> usize {
        self.tree.values().map(Vec::len).sum()
    }
}

/// Table contents as read from a fixture file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFixture {
    /// Table name
    pub name: String,
    /// Primary key and indexes
    pub schema: TableSchema,
    /// Rows, in insertion order
    #[serde(default)]
    pub rows: Vec<Value>,
    /// Out-of-line keys parallel to `rows` (unnamed primary keys only)
    #[serde(default)]
    pub keys: Option<Vec<Value>>,
}

/// A table held entirely in memory
#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    schema: TableSchema,
    records: BTreeMap<IndexKey, Value>,
    indexes: HashMap<String, IndexTree>,
    next_key: f64,
}

impl MemoryTable {
    /// Creates an empty table
    pub fn new(name: impl Into<String>, schema: TableSchema) -> StoreResult<Self> {
        schema
            .validate()
            .map_err(|e| StoreError::invalid_key(e.to_string()))?;
        let indexes = schema
            .indexes
            .iter()
            .map(|i| (i.name.clone(), IndexTree::default()))
            .collect();
        Ok(Self {
            name: name.into(),
            schema,
            records: BTreeMap::new(),
            indexes,
            next_key: 1.0,
        })
    }

    /// Builds a table from a fixture
    pub fn from_fixture(fixture: TableFixture) -> StoreResult<Self> {
        let mut table = Self::new(fixture.name, fixture.schema)?;
        match fixture.keys {
            Some(keys) => {
                if keys.len() != fixture.rows.len() {
                    return Err(StoreError::invalid_key(format!(
                        "Fixture has {} keys for {} rows",
                        keys.len(),
                        fixture.rows.len()
                    )));
                }
                for (key, row) in keys.iter().zip(fixture.rows) {
                    let key = IndexKey::from_json(key)
                        .ok_or_else(|| StoreError::invalid_key(format!("Invalid key {}", key)))?;
                    table.insert_with_key(key, row)?;
                }
            }
            None if table.schema.primary_key.is_unnamed() => {
                for row in fixture.rows {
                    table.add(row)?;
                }
            }
            None => {
                for row in fixture.rows {
                    table.insert(row)?;
                }
            }
        }
        debug!(
            table = %table.name,
            rows = table.records.len(),
            indexes = table.indexes.len(),
            "table loaded"
        );
        Ok(table)
    }

    /// Reads a fixture file (JSON)
    pub fn load(path: &Path) -> StoreResult<Self> {
        let bytes = fs::read(path).map_err(|e| {
            StoreError::read_failed(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let fixture: TableFixture = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::read_failed(format!("Cannot parse {}: {}", path.display(), e))
        })?;
        Self::from_fixture(fixture)
    }

    /// Inserts a row carrying its own (inline) primary key
    pub fn insert(&mut self, value: Value) -> StoreResult<IndexKey> {
        let key = match &self.schema.primary_key {
            PrimaryKey::Named { name } => get_path(&value, name).and_then(IndexKey::from_json),
            PrimaryKey::Compound { fields } => compound_key(&value, fields.iter().map(String::as_str)),
            PrimaryKey::Unnamed => {
                return Err(StoreError::invalid_key(
                    "Table has an out-of-line key; use add or insert_with_key",
                ))
            }
        }
        .ok_or_else(|| {
            StoreError::invalid_key(format!(
                "Row has no valid primary key '{}'",
                self.schema.primary_key.display_name()
            ))
        })?;
        self.put(key.clone(), value)?;
        Ok(key)
    }

    /// Inserts a row under an explicit out-of-line key
    pub fn insert_with_key(&mut self, key: IndexKey, value: Value) -> StoreResult<()> {
        if !self.schema.primary_key.is_unnamed() {
            return Err(StoreError::invalid_key(
                "Table has an inline key; explicit keys are not accepted",
            ));
        }
        if let Some(n) = key.as_f64() {
            if n >= self.next_key {
                self.next_key = n.floor() + 1.0;
            }
        }
        self.put(key, value)
    }

    /// Inserts a row under the next auto-incremented key
    pub fn add(&mut self, value: Value) -> StoreResult<IndexKey> {
        let key = IndexKey::from_f64(self.next_key)
            .ok_or_else(|| StoreError::invalid_key("Key generator exhausted"))?;
        self.insert_with_key(key.clone(), value)?;
        Ok(key)
    }

    fn put(&mut self, key: IndexKey, value: Value) -> StoreResult<()> {
        if self.records.contains_key(&key) {
            return Err(StoreError::duplicate_key(&key));
        }
        for spec in &self.schema.indexes {
            if let Some(index_key) = index_key(spec, &value) {
                if let Some(tree) = self.indexes.get_mut(&spec.name) {
                    tree.insert(index_key, key.clone());
                }
            }
        }
        self.records.insert(key, value);
        Ok(())
    }

    /// Number of rows present in an index
    pub fn index_len(&self, name: &str) -> StoreResult<usize> {
        self.indexes
            .get(name)
            .map(IndexTree::entry_count)
            .ok_or_else(|| StoreError::unknown_index(name))
    }

    fn tree(&self, target: &IndexTarget) -> StoreResult<Option<&IndexTree>> {
        match target {
            IndexTarget::PrimaryKey => Ok(None),
            IndexTarget::Index(name) | IndexTarget::CompoundHead(name) => self
                .indexes
                .get(name)
                .map(Some)
                .ok_or_else(|| StoreError::unknown_index(name.as_str())),
        }
    }

    /// Primary keys a source visits, in source order.
    ///
    /// The second list holds rows an index-ordered walk never reaches
    /// because they have no key for that index, in primary key order.
    /// They always come last, whatever the direction.
    fn visit(&self, source: &Source) -> StoreResult<(Vec<&IndexKey>, Vec<&IndexKey>)> {
        match source {
            Source::Table => Ok((self.records.keys().collect(), Vec::new())),
            Source::OrderBy(target) => match self.tree(target)? {
                None => Ok((self.records.keys().collect(), Vec::new())),
                Some(tree) => {
                    let ordered: Vec<&IndexKey> = tree.tree.values().flatten().collect();
                    let reached: HashSet<&IndexKey> = ordered.iter().copied().collect();
                    let unindexed = self
                        .records
                        .keys()
                        .filter(|k| !reached.contains(k))
                        .collect();
                    Ok((ordered, unindexed))
                }
            },
            Source::Where { target, matcher } => {
                let head = matches!(target, IndexTarget::CompoundHead(_));
                let keys = match self.tree(target)? {
                    None => select(&self.records, matcher, head)
                        .into_iter()
                        .map(|(k, _)| k)
                        .collect(),
                    Some(tree) => select(&tree.tree, matcher, head)
                        .into_iter()
                        .flat_map(|(_, pks)| pks.iter())
                        .collect(),
                };
                Ok((keys, Vec::new()))
            }
        }
    }

    /// Walks the collection, calling `emit` for every row inside the page window
    fn walk<F>(&self, collection: &Collection, cancel: &CancellationToken, mut emit: F) -> StoreResult<()>
    where
        F: FnMut(&IndexKey, &Value),
    {
        if cancel.is_cancelled() {
            return Err(StoreError::cancelled());
        }
        let (mut keys, unindexed) = self.visit(collection.source())?;
        if collection.is_reversed() {
            keys.reverse();
        }
        keys.extend(unindexed);

        let mut skipped = 0;
        let mut taken = 0;
        for key in keys {
            if cancel.is_cancelled() {
                return Err(StoreError::cancelled());
            }
            if collection.cap().is_some_and(|cap| taken >= cap) {
                break;
            }
            let Some(value) = self.records.get(key) else {
                continue;
            };
            if !collection.filters().is_empty() {
                let record = Record::new(key.clone(), value.clone());
                if !collection.accepts(&record) {
                    continue;
                }
            }
            if skipped < collection.skip() {
                skipped += 1;
                continue;
            }
            taken += 1;
            emit(key, value);
        }
        Ok(())
    }
}

impl TableStore for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn count_all(&self) -> StoreResult<usize> {
        Ok(self.records.len())
    }

    fn fetch(&self, collection: &Collection, cancel: &CancellationToken) -> StoreResult<Vec<Record>> {
        let mut out = Vec::new();
        self.walk(collection, cancel, |key, value| {
            out.push(Record::new(key.clone(), value.clone()))
        })?;
        Ok(out)
    }

    fn count(&self, collection: &Collection, cancel: &CancellationToken) -> StoreResult<usize> {
        let mut n = 0;
        self.walk(collection, cancel, |_, _| n += 1)?;
        Ok(n)
    }
}

/// Entries of an ordered map visited by a matcher, in key order.
///
/// With `head` set the matcher sees only the leading component of each key.
fn select<'a, V>(
    tree: &'a BTreeMap<IndexKey, V>,
    matcher: &KeyMatch,
    head: bool,
) -> Vec<(&'a IndexKey, &'a V)> {
    match matcher {
        KeyMatch::Nothing => Vec::new(),
        KeyMatch::Ranges(ranges) if !head => ranges
            .iter()
            .filter(|r| !r.is_empty())
            .flat_map(|r| tree.range::<IndexKey, _>(r.as_bounds()))
            .collect(),
        KeyMatch::AnyOf(keys) if !head => keys.iter().filter_map(|k| tree.get_key_value(k)).collect(),
        _ => tree
            .iter()
            .filter(|(k, _)| matcher.matches(if head { k.head() } else { k }))
            .collect(),
    }
}

fn compound_key<'a>(value: &Value, fields: impl Iterator<Item = &'a str>) -> Option<IndexKey> {
    fields
        .map(|f| get_path(value, f).and_then(IndexKey::from_json))
        .collect::<Option<Vec<_>>>()
        .map(IndexKey::from_parts)
}

fn index_key(spec: &IndexSpec, value: &Value) -> Option<IndexKey> {
    if spec.is_compound() {
        compound_key(value, spec.fields().into_iter())
    } else {
        get_path(value, spec.leading_field()).and_then(IndexKey::from_json)
    }
}
