//! Implicit primary key range resolution
//!
//! The primary key lookup runs a single matcher, so every range-mergeable
//! filter on `*key*` is folded into one `KeyMatch`:
//!
//! 1. above/below tighten one lower and one upper bound (exclusive bounds
//!    stay exclusive, no epsilon shifting)
//! 2. equal filters keep the keys every one of them matches (numeric text
//!    matches both the number and the text key); notequal keys and keys
//!    outside the bounds are dropped, and nothing left resolves to `Nothing`
//! 3. without equal filters, notequal keys inside the bounds puncture the
//!    range into sub-ranges
//! 4. otherwise the bounded range itself
//!
//! Contradictions are never errors; they resolve to an empty match.

use std::collections::BTreeSet;
use std::ops::Bound;

use tracing::{trace, warn};

use crate::filter::{Filter, FilterMethod, SearchValue};
use crate::store::{normalize_ranges, tighter_lower, tighter_upper, IndexKey, KeyMatch, KeyRange};

fn bound(key: IndexKey, inclusive: bool) -> Bound<IndexKey> {
    if inclusive {
        Bound::Included(key)
    } else {
        Bound::Excluded(key)
    }
}

/// Folds implicit-key filters into a single key matcher
pub fn resolve_key_range<'a, I>(filters: I) -> KeyMatch
where
    I: IntoIterator<Item = &'a Filter>,
{
    let mut lower = Bound::Unbounded;
    let mut upper = Bound::Unbounded;
    let mut allowed: Option<BTreeSet<IndexKey>> = None;
    let mut not_equal = BTreeSet::new();

    for filter in filters {
        let search = SearchValue::parse(&filter.search);
        trace!(method = %filter.method, key = %search.key(), "key constraint");
        match filter.method {
            FilterMethod::Above => {
                lower = tighter_lower(lower, bound(search.key(), filter.include_bounds))
            }
            FilterMethod::Below => {
                upper = tighter_upper(upper, bound(search.key(), filter.include_bounds))
            }
            FilterMethod::Equal => {
                let candidates: BTreeSet<IndexKey> = search.candidates().into_iter().collect();
                allowed = Some(match allowed {
                    None => candidates,
                    Some(prev) => prev.intersection(&candidates).cloned().collect(),
                });
            }
            FilterMethod::NotEqual => not_equal.extend(search.candidates()),
            _ => {}
        }
    }

    let range = KeyRange::new(lower, upper);

    if let Some(allowed) = allowed {
        let keys: Vec<IndexKey> = allowed
            .into_iter()
            .filter(|k| !not_equal.contains(k) && range.contains(k))
            .collect();
        if keys.is_empty() {
            warn!("contradictory key filters, empty range");
            return KeyMatch::Nothing;
        }
        return KeyMatch::AnyOf(keys);
    }

    if range.is_empty() {
        warn!("key bounds cross, empty range");
        return KeyMatch::Nothing;
    }

    let mut ranges = Vec::with_capacity(not_equal.len() + 1);
    let mut current = range.lower.clone();
    for key in not_equal.into_iter().filter(|k| range.contains(k)) {
        ranges.push(KeyRange::new(current, Bound::Excluded(key.clone())));
        current = Bound::Excluded(key);
    }
    ranges.push(KeyRange::new(current, range.upper));

    let ranges = normalize_ranges(ranges);
    if ranges.is_empty() {
        return KeyMatch::Nothing;
    }
    KeyMatch::Ranges(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: i64) -> IndexKey {
        IndexKey::from_i64(v)
    }

    fn matching(m: &KeyMatch, keys: impl IntoIterator<Item = i64>) -> Vec<i64> {
        keys.into_iter().filter(|k| m.matches(&n(*k))).collect()
    }

    #[test]
    fn test_exclusive_lower_inclusive_upper() {
        let filters = [
            Filter::on_key(FilterMethod::Above, "5"),
            Filter::on_key(FilterMethod::Below, "10").include_bounds(),
        ];
        let m = resolve_key_range(&filters);
        assert_eq!(matching(&m, 1..=12), vec![6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_puncture() {
        let filters = [
            Filter::on_key(FilterMethod::Above, "0"),
            Filter::on_key(FilterMethod::Below, "10"),
            Filter::on_key(FilterMethod::NotEqual, "5"),
        ];
        let m = resolve_key_range(&filters);
        assert_eq!(matching(&m, 0..=10), vec![1, 2, 3, 4, 6, 7, 8, 9]);
        match m {
            KeyMatch::Ranges(ranges) => assert_eq!(ranges.len(), 2),
            other => panic!("expected ranges, got {:?}", other),
        }
    }

    #[test]
    fn test_two_equals_is_nothing() {
        let filters = [
            Filter::on_key(FilterMethod::Equal, "1"),
            Filter::on_key(FilterMethod::Equal, "2"),
        ];
        assert_eq!(resolve_key_range(&filters), KeyMatch::Nothing);
    }

    #[test]
    fn test_same_equal_twice_is_fine() {
        let filters = [
            Filter::on_key(FilterMethod::Equal, "3"),
            Filter::on_key(FilterMethod::Equal, "3.0"),
        ];
        assert_eq!(resolve_key_range(&filters), KeyMatch::AnyOf(vec![n(3)]));
    }

    #[test]
    fn test_numeric_text_matches_number_and_string_keys() {
        let s = |v: &str| IndexKey::from_string(v);

        let m = resolve_key_range(&[Filter::on_key(FilterMethod::Equal, "5")]);
        assert_eq!(m, KeyMatch::AnyOf(vec![n(5), s("5")]));
        assert!(!m.matches(&n(6)));

        let m = resolve_key_range(&[Filter::on_key(FilterMethod::NotEqual, "5")]);
        assert!(!m.matches(&n(5)));
        assert!(!m.matches(&s("5")));
        assert!(m.matches(&n(6)));
        assert!(m.matches(&s("6")));

        let filters = [
            Filter::on_key(FilterMethod::Equal, "5"),
            Filter::on_key(FilterMethod::Below, "5"),
        ];
        assert_eq!(resolve_key_range(&filters), KeyMatch::Nothing);

        let filters = [
            Filter::on_key(FilterMethod::Equal, "5"),
            Filter::on_key(FilterMethod::Above, "5"),
        ];
        assert_eq!(resolve_key_range(&filters), KeyMatch::AnyOf(vec![s("5")]));
    }

    #[test]
    fn test_equal_and_not_equal_is_nothing() {
        let filters = [
            Filter::on_key(FilterMethod::Equal, "4"),
            Filter::on_key(FilterMethod::NotEqual, "4"),
        ];
        assert_eq!(resolve_key_range(&filters), KeyMatch::Nothing);
    }

    #[test]
    fn test_equal_outside_bounds() {
        let filters = [
            Filter::on_key(FilterMethod::Equal, "4"),
            Filter::on_key(FilterMethod::Above, "4"),
        ];
        assert_eq!(resolve_key_range(&filters), KeyMatch::Nothing);

        let filters = [
            Filter::on_key(FilterMethod::Equal, "4"),
            Filter::on_key(FilterMethod::Above, "4").include_bounds(),
        ];
        assert_eq!(resolve_key_range(&filters), KeyMatch::AnyOf(vec![n(4)]));
    }

    #[test]
    fn test_crossing_bounds() {
        let filters = [
            Filter::on_key(FilterMethod::Above, "5"),
            Filter::on_key(FilterMethod::Below, "5"),
        ];
        assert_eq!(resolve_key_range(&filters), KeyMatch::Nothing);
    }

    #[test]
    fn test_string_keys_sort_after_numbers() {
        let filters = [Filter::on_key(FilterMethod::Above, "b")];
        let m = resolve_key_range(&filters);
        assert!(!m.matches(&n(1_000)));
        assert!(!m.matches(&IndexKey::from_string("b")));
        assert!(m.matches(&IndexKey::from_string("b\u{1F600}")));
        assert!(m.matches(&IndexKey::from_string("c")));
    }

    #[test]
    fn test_no_filters_is_full_range() {
        let m = resolve_key_range(std::iter::empty::<&Filter>());
        assert_eq!(m, KeyMatch::Ranges(vec![KeyRange::full()]));
    }
}
