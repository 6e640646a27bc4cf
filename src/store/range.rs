//! Key ranges and key matchers
//!
//! A `KeyMatch` is what a where-clause resolves to: the set of index keys a
//! lookup visits. Ranges carry exact inclusive/exclusive bounds.

use std::cmp::Ordering;
use std::ops::Bound;

use super::key::IndexKey;

/// A contiguous key range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    /// Lower bound
    pub lower: Bound<IndexKey>,
    /// Upper bound
    pub upper: Bound<IndexKey>,
}

impl KeyRange {
    /// Creates a range from two bounds
    pub fn new(lower: Bound<IndexKey>, upper: Bound<IndexKey>) -> Self {
        Self { lower, upper }
    }

    /// The range covering every key
    pub fn full() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// A single-point range
    pub fn only(key: IndexKey) -> Self {
        Self::new(Bound::Included(key.clone()), Bound::Included(key))
    }

    /// Returns true if `key` lies inside the range
    pub fn contains(&self, key: &IndexKey) -> bool {
        let above_lower = match &self.lower {
            Bound::Included(l) => key >= l,
            Bound::Excluded(l) => key > l,
            Bound::Unbounded => true,
        };
        let below_upper = match &self.upper {
            Bound::Included(u) => key <= u,
            Bound::Excluded(u) => key < u,
            Bound::Unbounded => true,
        };
        above_lower && below_upper
    }

    /// Returns true if no key can satisfy the range.
    ///
    /// `BTreeMap::range` panics on such ranges, so callers must skip them.
    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Included(l), Bound::Included(u)) => l > u,
            (Bound::Included(l), Bound::Excluded(u))
            | (Bound::Excluded(l), Bound::Included(u))
            | (Bound::Excluded(l), Bound::Excluded(u)) => l >= u,
            _ => false,
        }
    }

    /// Borrowed bounds, suitable for `BTreeMap::range`
    pub fn as_bounds(&self) -> (Bound<&IndexKey>, Bound<&IndexKey>) {
        (self.lower.as_ref(), self.upper.as_ref())
    }
}

/// Picks the tighter of two lower bounds. On equal keys the exclusive bound wins.
pub fn tighter_lower(a: Bound<IndexKey>, b: Bound<IndexKey>) -> Bound<IndexKey> {
    match compare_lower(&a, &b) {
        Ordering::Less => b,
        _ => a,
    }
}

/// Picks the tighter of two upper bounds. On equal keys the exclusive bound wins.
pub fn tighter_upper(a: Bound<IndexKey>, b: Bound<IndexKey>) -> Bound<IndexKey> {
    match compare_upper(&a, &b) {
        Ordering::Greater => b,
        _ => a,
    }
}

/// Orders lower bounds from loosest to tightest
fn compare_lower(a: &Bound<IndexKey>, b: &Bound<IndexKey>) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Less,
        (_, Bound::Unbounded) => Ordering::Greater,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Less),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Greater),
    }
}

/// Orders upper bounds from tightest to loosest
fn compare_upper(a: &Bound<IndexKey>, b: &Bound<IndexKey>) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Greater,
        (_, Bound::Unbounded) => Ordering::Less,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Greater),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Less),
    }
}

/// Sorts ranges, drops empty ones and merges overlapping or touching ranges.
pub fn normalize_ranges(mut ranges: Vec<KeyRange>) -> Vec<KeyRange> {
    ranges.retain(|r| !r.is_empty());
    ranges.sort_by(|a, b| compare_lower(&a.lower, &b.lower));

    let mut merged: Vec<KeyRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if touches(&last.upper, &range.lower) => {
                if compare_upper(&range.upper, &last.upper) == Ordering::Greater {
                    last.upper = range.upper;
                }
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// True if a range ending at `upper` overlaps or abuts one starting at `lower`
fn touches(upper: &Bound<IndexKey>, lower: &Bound<IndexKey>) -> bool {
    match (upper, lower) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => true,
        (Bound::Included(u), Bound::Included(l)) => l <= u,
        (Bound::Included(u), Bound::Excluded(l)) | (Bound::Excluded(u), Bound::Included(l)) => {
            l <= u
        }
        (Bound::Excluded(u), Bound::Excluded(l)) => l < u,
    }
}

/// The set of keys a lookup visits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatch {
    /// Any of the listed ranges (sorted, disjoint)
    Ranges(Vec<KeyRange>),
    /// Exactly the listed keys (sorted, deduplicated)
    AnyOf(Vec<IndexKey>),
    /// Keys whose rendering equals the text, ignoring case
    EqualsIgnoreCase(String),
    /// Keys whose rendering starts with the prefix
    StartsWith(String),
    /// Keys whose rendering starts with the prefix, ignoring case
    StartsWithIgnoreCase(String),
    /// Matches no key
    Nothing,
}

impl KeyMatch {
    /// Returns true if the key is visited by this matcher
    pub fn matches(&self, key: &IndexKey) -> bool {
        match self {
            KeyMatch::Ranges(ranges) => ranges.iter().any(|r| r.contains(key)),
            KeyMatch::AnyOf(keys) => keys.binary_search(key).is_ok(),
            KeyMatch::EqualsIgnoreCase(text) => key.render().to_lowercase() == text.to_lowercase(),
            KeyMatch::StartsWith(prefix) => match key.as_str() {
                Some(s) => s.starts_with(prefix.as_str()),
                None => key.render().starts_with(prefix.as_str()),
            },
            KeyMatch::StartsWithIgnoreCase(prefix) => key
                .render()
                .to_lowercase()
                .starts_with(&prefix.to_lowercase()),
            KeyMatch::Nothing => false,
        }
    }

    /// Returns true if the matcher can never match
    pub fn is_nothing(&self) -> bool {
        match self {
            KeyMatch::Nothing => true,
            KeyMatch::Ranges(ranges) => ranges.is_empty(),
            KeyMatch::AnyOf(keys) => keys.is_empty(),
            _ => false,
        }
    }

    /// Short description for explain output
    pub fn describe(&self) -> String {
        match self {
            KeyMatch::Ranges(ranges) => {
                let parts: Vec<String> = ranges.iter().map(describe_range).collect();
                format!("inAnyRange({})", parts.join(", "))
            }
            KeyMatch::AnyOf(keys) => {
                let parts: Vec<String> = keys.iter().map(ToString::to_string).collect();
                format!("anyOf({})", parts.join(", "))
            }
            KeyMatch::EqualsIgnoreCase(text) => format!("equalsIgnoreCase({:?})", text),
            KeyMatch::StartsWith(prefix) => format!("startsWith({:?})", prefix),
            KeyMatch::StartsWithIgnoreCase(prefix) => format!("startsWithIgnoreCase({:?})", prefix),
            KeyMatch::Nothing => "nothing".to_string(),
        }
    }
}

fn describe_range(range: &KeyRange) -> String {
    let lower = match &range.lower {
        Bound::Included(k) => format!("[{}", k),
        Bound::Excluded(k) => format!("({}", k),
        Bound::Unbounded => "(-inf".to_string(),
    };
    let upper = match &range.upper {
        Bound::Included(k) => format!("{}]", k),
        Bound::Excluded(k) => format!("{})", k),
        Bound::Unbounded => "+inf)".to_string(),
    };
    format!("{}, {}", lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: i64) -> IndexKey {
        IndexKey::from_i64(v)
    }

    #[test]
    fn test_contains_respects_bounds() {
        let range = KeyRange::new(Bound::Excluded(n(5)), Bound::Included(n(10)));
        assert!(!range.contains(&n(5)));
        assert!(range.contains(&n(6)));
        assert!(range.contains(&n(10)));
        assert!(!range.contains(&n(11)));
    }

    #[test]
    fn test_empty_ranges() {
        assert!(KeyRange::new(Bound::Included(n(5)), Bound::Excluded(n(5))).is_empty());
        assert!(KeyRange::new(Bound::Included(n(6)), Bound::Included(n(5))).is_empty());
        assert!(!KeyRange::only(n(5)).is_empty());
        assert!(!KeyRange::full().is_empty());
    }

    #[test]
    fn test_tighter_bounds_prefer_exclusive() {
        let lower = tighter_lower(Bound::Included(n(5)), Bound::Excluded(n(5)));
        assert_eq!(lower, Bound::Excluded(n(5)));

        let upper = tighter_upper(Bound::Excluded(n(9)), Bound::Included(n(9)));
        assert_eq!(upper, Bound::Excluded(n(9)));

        assert_eq!(tighter_lower(Bound::Unbounded, Bound::Included(n(1))), Bound::Included(n(1)));
        assert_eq!(tighter_upper(Bound::Included(n(3)), Bound::Included(n(2))), Bound::Included(n(2)));
    }

    #[test]
    fn test_numbers_sort_before_strings_in_bounds() {
        let lower = tighter_lower(Bound::Included(n(100)), Bound::Included(IndexKey::from_string("a")));
        assert_eq!(lower, Bound::Included(IndexKey::from_string("a")));
    }

    #[test]
    fn test_normalize_merges_overlaps() {
        let ranges = normalize_ranges(vec![
            KeyRange::new(Bound::Included(n(5)), Bound::Included(n(8))),
            KeyRange::new(Bound::Included(n(1)), Bound::Included(n(3))),
            KeyRange::new(Bound::Included(n(3)), Bound::Excluded(n(4))),
            KeyRange::new(Bound::Included(n(9)), Bound::Excluded(n(9))),
        ]);
        assert_eq!(
            ranges,
            vec![
                KeyRange::new(Bound::Included(n(1)), Bound::Excluded(n(4))),
                KeyRange::new(Bound::Included(n(5)), Bound::Included(n(8))),
            ]
        );
    }

    #[test]
    fn test_normalize_keeps_punctures() {
        let ranges = normalize_ranges(vec![
            KeyRange::new(Bound::Unbounded, Bound::Excluded(n(5))),
            KeyRange::new(Bound::Excluded(n(5)), Bound::Unbounded),
        ]);
        assert_eq!(ranges.len(), 2);
        assert!(!KeyMatch::Ranges(ranges).matches(&n(5)));
    }

    #[test]
    fn test_starts_with_matches_rendered_numbers() {
        let matcher = KeyMatch::StartsWith("1".into());
        assert!(matcher.matches(&IndexKey::from_string("12")));
        assert!(matcher.matches(&n(12)));
        assert!(matcher.matches(&IndexKey::from_f64(1.5).unwrap()));
        assert!(!matcher.matches(&n(21)));
        assert!(!matcher.matches(&IndexKey::from_string("21")));
    }

    #[test]
    fn test_ignore_case_matchers() {
        let eq = KeyMatch::EqualsIgnoreCase("abc".into());
        assert!(eq.matches(&IndexKey::from_string("ABC")));
        assert!(!eq.matches(&IndexKey::from_string("abcd")));

        let prefix = KeyMatch::StartsWithIgnoreCase("ab".into());
        assert!(prefix.matches(&IndexKey::from_string("Abc")));
    }
}
