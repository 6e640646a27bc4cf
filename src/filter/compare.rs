//! Compiled filter predicates
//!
//! A `Filter` is compiled once per query into a closure over the field
//! value. Compilation fails fast on an invalid regular expression or an
//! `empty` search that is neither `yes` nor `no`.
//!
//! A missing field never matches a comparison; `notequal` means the field
//! is present and not equal. Only `empty` can match a missing field.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use regex::RegexBuilder;
use serde_json::Value;

use crate::store::{Record, RecordPredicate};

use super::errors::{FilterError, FilterResult};
use super::method::FilterMethod;
use super::model::{EmptyKind, Filter, FilterField};
use super::value::{get_path, render, SearchValue};

type Test = Box<dyn Fn(Option<&Value>) -> bool + Send + Sync>;

/// A filter ready to run against records
pub struct CompiledFilter {
    filter: Filter,
    test: Test,
}

impl CompiledFilter {
    /// Returns the source filter
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Evaluates the filter against a field value (`None` when absent)
    pub fn evaluate(&self, value: Option<&Value>) -> bool {
        (self.test)(value)
    }
}

impl fmt::Debug for CompiledFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFilter")
            .field("filter", &self.filter.describe())
            .finish()
    }
}

impl RecordPredicate for CompiledFilter {
    fn test(&self, record: &Record) -> bool {
        let value = field_value(&self.filter.field, record);
        self.evaluate(value.as_deref())
    }
}

/// Reads the value a field addresses in a record
pub fn field_value<'a>(field: &FilterField, record: &'a Record) -> Option<Cow<'a, Value>> {
    match field {
        FilterField::Named(path) => get_path(&record.value, path).map(Cow::Borrowed),
        FilterField::ImplicitKey => Some(Cow::Owned(record.primary_key.to_json())),
        FilterField::DirectValue => Some(Cow::Borrowed(&record.value)),
    }
}

/// Compiles a filter
pub fn compile(filter: &Filter) -> FilterResult<CompiledFilter> {
    let field = filter.field.as_str();
    let test: Test = match filter.method {
        FilterMethod::Empty => {
            let expect = match filter.search.as_str() {
                "yes" => true,
                "no" => false,
                other => {
                    return Err(FilterError::invalid_search(
                        field,
                        format!("expected 'yes' or 'no', got '{}'", other),
                    ))
                }
            };
            let kinds = filter.empty.clone();
            Box::new(move |value| is_empty(value, &kinds) == expect)
        }
        FilterMethod::Regexp => {
            let regex = RegexBuilder::new(&filter.search)
                .case_insensitive(!filter.case_sensitive)
                .build()
                .map_err(|e| FilterError::invalid_pattern(field, e))?;
            Box::new(move |value| value.is_some_and(|v| regex.is_match(&render(v))))
        }
        method => {
            let compare = method.comparison(filter.include_bounds).ok_or_else(|| {
                FilterError::invalid_search(field, format!("no comparison for '{}'", method))
            })?;
            if filter.case_sensitive {
                let search = SearchValue::parse(&filter.search);
                Box::new(move |value| value.is_some_and(|v| compare(v, &search)))
            } else {
                let search = SearchValue::text_only(&filter.search.to_lowercase());
                Box::new(move |value| {
                    value.is_some_and(|v| {
                        let folded = Value::String(render(v).to_lowercase());
                        compare(&folded, &search)
                    })
                })
            }
        }
    };
    Ok(CompiledFilter {
        filter: filter.clone(),
        test,
    })
}

fn is_empty(value: Option<&Value>, kinds: &BTreeSet<EmptyKind>) -> bool {
    let kind = match value {
        None => EmptyKind::Undefined,
        Some(Value::Null) => EmptyKind::Null,
        Some(Value::String(s)) if s.is_empty() => EmptyKind::String,
        Some(Value::Array(a)) if a.is_empty() => EmptyKind::Array,
        Some(Value::Object(o)) if o.is_empty() => EmptyKind::Object,
        Some(_) => return false,
    };
    kinds.contains(&kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::IndexKey;
    use serde_json::json;

    fn eval(filter: Filter, value: Option<Value>) -> bool {
        compile(&filter).unwrap().evaluate(value.as_ref())
    }

    #[test]
    fn test_missing_field_never_compares() {
        for method in [
            FilterMethod::Equal,
            FilterMethod::NotEqual,
            FilterMethod::Below,
            FilterMethod::Contains,
            FilterMethod::Regexp,
        ] {
            assert!(!eval(Filter::new("a", method, "x"), None), "{}", method);
        }
    }

    #[test]
    fn test_case_insensitive_equal() {
        let f = Filter::new("name", FilterMethod::Equal, "Abc").case_insensitive();
        assert!(eval(f.clone(), Some(json!("abc"))));
        assert!(eval(f.clone(), Some(json!("ABC"))));
        assert!(!eval(f, Some(json!("abd"))));

        let strict = Filter::new("name", FilterMethod::Equal, "Abc");
        assert!(!eval(strict, Some(json!("abc"))));
    }

    #[test]
    fn test_case_insensitive_contains_on_numbers() {
        let f = Filter::new("n", FilterMethod::Contains, "23").case_insensitive();
        assert!(eval(f, Some(json!(1234))));
    }

    #[test]
    fn test_regexp() {
        let f = Filter::new("name", FilterMethod::Regexp, "^a.c$");
        assert!(eval(f.clone(), Some(json!("abc"))));
        assert!(!eval(f, Some(json!("ABC"))));

        let ci = Filter::new("name", FilterMethod::Regexp, "^a.c$").case_insensitive();
        assert!(eval(ci, Some(json!("ABC"))));
    }

    #[test]
    fn test_invalid_regexp_fails_fast() {
        let err = compile(&Filter::new("name", FilterMethod::Regexp, "(")).unwrap_err();
        assert_eq!(err.code(), crate::filter::FilterErrorCode::InvalidPattern);
    }

    #[test]
    fn test_empty_yes_and_no() {
        let kinds = [EmptyKind::Undefined, EmptyKind::String, EmptyKind::Array];
        let yes = Filter::new("tags", FilterMethod::Empty, "yes").with_empty(kinds);
        assert!(eval(yes.clone(), None));
        assert!(eval(yes.clone(), Some(json!(""))));
        assert!(eval(yes.clone(), Some(json!([]))));
        assert!(!eval(yes.clone(), Some(json!(null))));
        assert!(!eval(yes.clone(), Some(json!({}))));
        assert!(!eval(yes, Some(json!(["a"]))));

        let no = Filter::new("tags", FilterMethod::Empty, "no").with_empty(kinds);
        assert!(!eval(no.clone(), None));
        assert!(eval(no.clone(), Some(json!(null))));
        assert!(eval(no, Some(json!(["a"]))));
    }

    #[test]
    fn test_empty_rejects_other_search() {
        let f = Filter::new("tags", FilterMethod::Empty, "maybe").with_empty([EmptyKind::Null]);
        assert!(compile(&f).is_err());
    }

    #[test]
    fn test_record_fields() {
        let record = Record::new(IndexKey::from_i64(7), json!({"address": {"city": "Oslo"}}));

        let nested = compile(&Filter::new("address.city", FilterMethod::Equal, "Oslo")).unwrap();
        assert!(nested.test(&record));

        let key = compile(&Filter::on_key(FilterMethod::Above, "5")).unwrap();
        assert!(key.test(&record));

        let direct = Record::new(IndexKey::from_i64(1), json!("hello"));
        let value = compile(&Filter::new("*value*", FilterMethod::StartsWith, "he")).unwrap();
        assert!(value.test(&direct));
    }

    #[test]
    fn test_include_bounds() {
        let exclusive = Filter::new("n", FilterMethod::Above, "5");
        assert!(!eval(exclusive, Some(json!(5))));
        let inclusive = Filter::new("n", FilterMethod::Above, "5").include_bounds();
        assert!(eval(inclusive, Some(json!(5))));
    }
}
