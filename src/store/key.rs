//! Ordered key values
//!
//! Keys follow the ordering of an IndexedDB-style engine:
//! Number < String < Array. Arrays compare element-wise, a shorter array
//! that is a prefix of a longer one sorts first. Booleans, null and objects
//! are not valid keys; rows holding them are simply absent from an index.

use std::fmt;

use serde_json::Value;

/// A key stored in the primary key tree or in a secondary index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Number (f64 stored as order-preserving bits)
    Number(u64),
    /// String, ordered by code point
    String(String),
    /// Array of keys (compound keys)
    Array(Vec<IndexKey>),
}

impl IndexKey {
    /// Create a key from a float.
    ///
    /// Returns `None` for NaN. `-0.0` is folded into `0.0`.
    pub fn from_f64(v: f64) -> Option<Self> {
        if v.is_nan() {
            return None;
        }
        let v = if v == 0.0 { 0.0 } else { v };
        let bits = v.to_bits();
        // Negative: flip all bits. Positive: flip sign bit.
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        Some(IndexKey::Number(ordered))
    }

    /// Create a key from an integer
    pub fn from_i64(v: i64) -> Self {
        // i64 -> f64 never produces NaN
        Self::from_f64(v as f64).unwrap_or(IndexKey::Number(1 << 63))
    }

    /// Create a key from a string
    pub fn from_string(v: impl Into<String>) -> Self {
        IndexKey::String(v.into())
    }

    /// Create a compound key
    pub fn from_parts(parts: Vec<IndexKey>) -> Self {
        IndexKey::Array(parts)
    }

    /// Create a key from a JSON value.
    ///
    /// Numbers, strings and arrays made only of valid keys are keys.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().and_then(Self::from_f64),
            Value::String(s) => Some(IndexKey::from_string(s.as_str())),
            Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Option<Vec<_>>>()
                .map(IndexKey::Array),
            _ => None,
        }
    }

    /// Returns the numeric value if this is a number key
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            IndexKey::Number(ordered) => {
                let bits = if (ordered >> 63) == 1 {
                    ordered ^ (1 << 63)
                } else {
                    !ordered
                };
                Some(f64::from_bits(bits))
            }
            _ => None,
        }
    }

    /// Returns the string value if this is a string key
    pub fn as_str(&self) -> Option<&str> {
        match self {
            IndexKey::String(s) => Some(s),
            _ => None,
        }
    }

    /// First component of a compound key, or the key itself.
    pub fn head(&self) -> &IndexKey {
        match self {
            IndexKey::Array(parts) => parts.first().unwrap_or(self),
            _ => self,
        }
    }

    /// Converts the key back to JSON.
    ///
    /// Integral numbers within the i64 range come back as integers.
    pub fn to_json(&self) -> Value {
        match self {
            IndexKey::Number(_) => {
                let v = self.as_f64().unwrap_or_default();
                number_to_json(v)
            }
            IndexKey::String(s) => Value::String(s.clone()),
            IndexKey::Array(parts) => Value::Array(parts.iter().map(IndexKey::to_json).collect()),
        }
    }

    /// Human readable rendering used for case-insensitive key matching
    pub fn render(&self) -> String {
        match self {
            IndexKey::String(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Converts a float to JSON, keeping integral values as integers.
pub fn number_to_json(v: f64) -> Value {
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Value::from(v as i64)
    } else {
        serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
