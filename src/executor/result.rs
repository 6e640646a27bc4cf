//! Result types for query execution

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::filter::{DIRECT_VALUE_FIELD, IMPLICIT_KEY_FIELD};
use crate::store::Record;

/// One page of rows plus the total number of matching rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Rows of the page, in result order
    pub data: Vec<Value>,
    /// Rows matching the filters, ignoring the page window
    pub total: usize,
}

impl QueryResponse {
    /// Creates a response
    pub fn new(data: Vec<Value>, total: usize) -> Self {
        Self { data, total }
    }

    /// An empty response
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }
}

/// Turns a stored record into a response row.
///
/// With `inject_key`, object rows gain a `*key*` field; other rows are
/// wrapped as `{"*key*": key, "*value*": value}`.
pub fn shape_row(record: Record, inject_key: bool) -> Value {
    if !inject_key {
        return record.value;
    }
    let key = record.primary_key.to_json();
    match record.value {
        Value::Object(mut map) => {
            map.insert(IMPLICIT_KEY_FIELD.to_string(), key);
            Value::Object(map)
        }
        other => {
            let mut map = Map::new();
            map.insert(IMPLICIT_KEY_FIELD.to_string(), key);
            map.insert(DIRECT_VALUE_FIELD.to_string(), other);
            Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::IndexKey;
    use serde_json::json;

    #[test]
    fn test_shape_object_row() {
        let record = Record::new(IndexKey::from_i64(3), json!({"a": 1}));
        assert_eq!(shape_row(record.clone(), false), json!({"a": 1}));
        assert_eq!(shape_row(record, true), json!({"a": 1, "*key*": 3}));
    }

    #[test]
    fn test_shape_direct_value_row() {
        let record = Record::new(IndexKey::from_string("k"), json!("hello"));
        assert_eq!(
            shape_row(record, true),
            json!({"*key*": "k", "*value*": "hello"})
        );
    }

    #[test]
    fn test_response_wire_shape() {
        let response = QueryResponse::new(vec![json!({"a": 1})], 7);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"data": [{"a": 1}], "total": 7})
        );
    }
}
