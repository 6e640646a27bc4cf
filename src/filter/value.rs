//! Stored value helpers: path lookup, string rendering, search typing

use serde_json::Value;

use crate::store::{number_to_json, IndexKey};

/// Resolves a dotted path (`address.city`) against a value.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(direct) = value.as_object().and_then(|o| o.get(path)) {
        return Some(direct);
    }
    let mut current = value;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// True if the path walks into a nested object
pub fn is_nested_path(path: &str) -> bool {
    path.contains('.')
}

/// String rendering of a stored value.
///
/// Integral floats drop their fractional part; arrays and objects render
/// as compact JSON.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => number_to_json(f).to_string(),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Search text of a filter, typed once.
///
/// Text that parses as a finite number is looked up as a number key;
/// equality also accepts the raw text as a string key.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchValue {
    text: String,
    number: Option<f64>,
}

impl SearchValue {
    /// Types the search text
    pub fn parse(text: &str) -> Self {
        let number = text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && !text.trim().is_empty());
        Self {
            text: text.to_string(),
            number,
        }
    }

    /// Treats the search text as a string only
    pub fn text_only(text: &str) -> Self {
        Self {
            text: text.to_string(),
            number: None,
        }
    }

    /// Raw text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Ordered key used for range comparisons and range lookups
    pub fn key(&self) -> IndexKey {
        self.number
            .and_then(IndexKey::from_f64)
            .unwrap_or_else(|| IndexKey::from_string(self.text.as_str()))
    }

    /// Keys an equality matches: the typed key and, for numeric text, the text itself
    pub fn candidates(&self) -> Vec<IndexKey> {
        let mut keys = vec![self.key()];
        if self.number.is_some() {
            keys.push(IndexKey::from_string(self.text.as_str()));
        }
        keys
    }

    /// True if the key is one of the equality candidates
    pub fn matches_key(&self, key: &IndexKey) -> bool {
        match key {
            IndexKey::String(s) => *s == self.text,
            IndexKey::Number(_) => self.number.is_some() && *key == self.key(),
            IndexKey::Array(_) => false,
        }
    }
}
