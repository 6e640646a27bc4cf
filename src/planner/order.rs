//! Filter application order
//!
//! Rank, lowest first:
//! 1. filters on the implicit primary key
//! 2. indexed filters, by method priority (equal, startswith, below, above, notequal)
//! 3. compound-head indexable filters
//! 4. everything else
//!
//! The sort is stable, so ties keep caller order.

use crate::filter::Filter;

use super::classify::{is_compound_head_indexed, is_indexed_filter};

fn rank(filter: &Filter) -> (u8, usize) {
    if filter.field.is_implicit_key() {
        (0, 0)
    } else if is_indexed_filter(filter) {
        (1, filter.method.index_priority())
    } else if is_compound_head_indexed(filter) {
        (2, 0)
    } else {
        (3, 0)
    }
}

/// Orders filters so the cheapest, most selective ones are applied first
pub fn optimize_apply_order<'a, I>(filters: I) -> Vec<&'a Filter>
where
    I: IntoIterator<Item = &'a Filter>,
{
    let mut ordered: Vec<&Filter> = filters.into_iter().collect();
    ordered.sort_by_key(|f| rank(f));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterMethod;

    fn fields(ordered: &[&Filter]) -> Vec<String> {
        ordered.iter().map(|f| f.field.to_string()).collect()
    }

    #[test]
    fn test_key_first_then_indexed() {
        let filters = vec![
            Filter::new("name", FilterMethod::Contains, "a"),
            Filter::new("age", FilterMethod::Above, "3").indexed(),
            Filter::on_key(FilterMethod::Below, "10"),
            Filter::new("city", FilterMethod::Equal, "Oslo").indexed(),
        ];
        let ordered = optimize_apply_order(&filters);
        assert_eq!(fields(&ordered), vec!["*key*", "city", "age", "name"]);
    }

    #[test]
    fn test_compound_head_before_unindexed() {
        let filters = vec![
            Filter::new("note", FilterMethod::EndsWith, "x"),
            Filter::new("last", FilterMethod::Equal, "Ng").compound_head(),
        ];
        let ordered = optimize_apply_order(&filters);
        assert_eq!(fields(&ordered), vec!["last", "note"]);
    }

    #[test]
    fn test_case_insensitive_range_is_not_indexed() {
        let filters = vec![
            Filter::new("a", FilterMethod::Below, "x").indexed().case_insensitive(),
            Filter::new("b", FilterMethod::NotEqual, "y").indexed(),
        ];
        let ordered = optimize_apply_order(&filters);
        assert_eq!(fields(&ordered), vec!["b", "a"]);
    }

    #[test]
    fn test_ties_are_stable() {
        let filters = vec![
            Filter::new("b", FilterMethod::Contains, "1"),
            Filter::new("a", FilterMethod::Contains, "2"),
            Filter::new("c", FilterMethod::Contains, "3"),
        ];
        let ordered = optimize_apply_order(&filters);
        assert_eq!(fields(&ordered), vec!["b", "a", "c"]);
    }
}
