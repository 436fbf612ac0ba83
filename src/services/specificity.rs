//! Path pattern specificity ordering
//!
//! The CDN evaluates behaviors in list order and the first match wins, so the
//! list must run from most to least specific. The order is:
//!
//! 1. Longer patterns before shorter ones.
//! 2. Equal lengths compare position by position. A concrete character beats
//!    `?` (exactly one character), which beats `*` (any run of characters).
//!    Concrete characters compare by codepoint. The first differing position
//!    decides.
//!
//! Every position maps to one rank on a single scale, so the order is total and
//! transitive.

use std::cmp::Ordering;

/// Rank of one pattern character; lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Concrete(char),
    SingleWildcard,
    MultiWildcard,
}

fn rank(c: char) -> Rank {
    match c {
        '?' => Rank::SingleWildcard,
        '*' => Rank::MultiWildcard,
        other => Rank::Concrete(other),
    }
}

/// Compare two patterns; `Ordering::Less` means `a` is more specific than `b`.
pub fn compare(a: &str, b: &str) -> Ordering {
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    if len_a != len_b {
        return len_b.cmp(&len_a);
    }

    a.chars()
        .zip(b.chars())
        .map(|(x, y)| rank(x).cmp(&rank(y)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Sort patterns in place, most specific first.
pub fn sort_most_specific_first<S: AsRef<str>>(patterns: &mut [S]) {
    patterns.sort_by(|a, b| compare(a.as_ref(), b.as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn longer_precedes_shorter() {
        assert_eq!(compare("/foo/bar", "/foo"), Ordering::Less);
        assert_eq!(compare("/foo", "/foo/bar"), Ordering::Greater);
        assert_eq!(compare("/a/*", "/*"), Ordering::Less);
    }

    #[test]
    fn concrete_before_single_before_multi() {
        assert_eq!(compare("/foo/a", "/foo/?"), Ordering::Less);
        assert_eq!(compare("/foo/?", "/foo/*"), Ordering::Less);
        assert_eq!(compare("/foo/a", "/foo/*"), Ordering::Less);
    }

    #[test]
    fn concrete_characters_by_codepoint() {
        assert_eq!(compare("/a", "/b"), Ordering::Less);
        assert_eq!(compare("/B", "/a"), Ordering::Less);
    }

    #[test]
    fn equal_strings_are_equal() {
        assert_eq!(compare("/foo/*", "/foo/*"), Ordering::Equal);
    }

    #[test]
    fn first_difference_decides() {
        // '*' loses at position 1 even though later characters are concrete.
        assert_eq!(compare("/a*", "/*a"), Ordering::Less);
    }

    #[test]
    fn sorts_translated_prefix_pairs() {
        let mut patterns = vec!["/*", "/api", "/api/*", "/api/users/*", "/api/users"];
        sort_most_specific_first(&mut patterns);
        assert_eq!(patterns, vec!["/api/users/*", "/api/users", "/api/*", "/api", "/*"]);
    }

    fn pattern() -> impl Strategy<Value = String> {
        "[/ab?*]{0,6}"
    }

    proptest! {
        #[test]
        fn antisymmetric(a in pattern(), b in pattern()) {
            prop_assert_eq!(compare(&a, &b), compare(&b, &a).reverse());
        }

        #[test]
        fn equal_only_when_identical(a in pattern(), b in pattern()) {
            prop_assert_eq!(compare(&a, &b) == Ordering::Equal, a == b);
        }

        #[test]
        fn transitive(a in pattern(), b in pattern(), c in pattern()) {
            if compare(&a, &b) != Ordering::Greater && compare(&b, &c) != Ordering::Greater {
                prop_assert_ne!(compare(&a, &c), Ordering::Greater);
            }
        }

        #[test]
        fn sorted_output_is_pairwise_ordered(mut patterns in proptest::collection::vec(pattern(), 0..12)) {
            sort_most_specific_first(&mut patterns);
            for window in patterns.windows(2) {
                prop_assert_ne!(compare(&window[0], &window[1]), Ordering::Greater);
            }
        }
    }
}
