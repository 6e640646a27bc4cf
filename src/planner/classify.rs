//! Index applicability
//!
//! Decides from a filter alone whether an ordered index can serve it. The
//! `indexed` and `compound_head` flags are facts about the column supplied
//! by the caller; the schema is only consulted later, to resolve the index.

use crate::filter::{Filter, FilterMethod};

fn case_rule_holds(filter: &Filter) -> bool {
    !filter.method.case_sensitive_only() || filter.case_sensitive
}

/// True if a true index (primary key or single-field index) can serve the filter
pub fn is_indexed_filter(filter: &Filter) -> bool {
    filter.indexed && filter.method.lookup().is_some() && case_rule_holds(filter)
}

/// True if the leading field of a compound index can serve the filter.
///
/// Only prefix-safe methods qualify; a range on the head of a compound
/// index would also need bounds on the trailing fields.
pub fn is_compound_head_indexed(filter: &Filter) -> bool {
    filter.compound_head && filter.method.is_compound_prefix() && case_rule_holds(filter)
}

/// True if the filter targets the implicit primary key with a range-mergeable method
pub fn is_key_range_filter(filter: &Filter) -> bool {
    filter.field.is_implicit_key()
        && matches!(
            filter.method,
            FilterMethod::Equal | FilterMethod::NotEqual | FilterMethod::Below | FilterMethod::Above
        )
        && filter.case_sensitive
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_requires_lookup() {
        assert!(is_indexed_filter(&Filter::new("a", FilterMethod::Equal, "1").indexed()));
        assert!(!is_indexed_filter(&Filter::new("a", FilterMethod::Contains, "1").indexed()));
        assert!(!is_indexed_filter(&Filter::new("a", FilterMethod::Equal, "1")));
    }

    #[test]
    fn test_case_sensitive_only_methods() {
        let below = Filter::new("a", FilterMethod::Below, "1").indexed();
        assert!(is_indexed_filter(&below));
        assert!(!is_indexed_filter(&below.case_insensitive()));

        let equal = Filter::new("a", FilterMethod::Equal, "x").indexed().case_insensitive();
        assert!(is_indexed_filter(&equal));
        let starts = Filter::new("a", FilterMethod::StartsWith, "x").indexed().case_insensitive();
        assert!(is_indexed_filter(&starts));
    }

    #[test]
    fn test_compound_head_never_serves_ranges() {
        for method in [FilterMethod::Below, FilterMethod::Above] {
            let f = Filter::new("last", method, "m").compound_head();
            assert!(!is_compound_head_indexed(&f));
        }
        for method in [FilterMethod::Equal, FilterMethod::NotEqual, FilterMethod::StartsWith] {
            let f = Filter::new("last", method, "m").compound_head();
            assert!(is_compound_head_indexed(&f));
        }
        let ne = Filter::new("last", FilterMethod::NotEqual, "m")
            .compound_head()
            .case_insensitive();
        assert!(!is_compound_head_indexed(&ne));
    }

    #[test]
    fn test_key_range_filters() {
        assert!(is_key_range_filter(&Filter::on_key(FilterMethod::Above, "1")));
        assert!(!is_key_range_filter(&Filter::on_key(FilterMethod::StartsWith, "1")));
        assert!(!is_key_range_filter(&Filter::on_key(FilterMethod::Equal, "a").case_insensitive()));
        assert!(!is_key_range_filter(&Filter::new("id", FilterMethod::Above, "1")));
    }
}
