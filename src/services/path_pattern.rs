//! Path pattern translation
//!
//! The CDN has no native prefix match: a behavior path pattern is matched
//! literally except for `*` and `?` wildcards. Prefix routes are emulated with
//! an explicit pattern plus a wildcard pattern below it.
//!
//! | Match kind | Route path  | Patterns                 |
//! |------------|-------------|--------------------------|
//! | Exact      | `/health`   | `/health`                |
//! | Prefix     | `/`         | `/*`                     |
//! | Prefix     | `/static/`  | `/static`, `/static/*`   |
//! | Prefix     | `/api`      | `/api`, `/api/*`         |

use crate::domain::{MatchKind, PathSpec};

/// Translate one route path into backend path patterns.
pub fn translate(path: &PathSpec) -> Vec<String> {
    match path.match_kind {
        MatchKind::Exact => vec![path.pattern.clone()],
        MatchKind::Prefix => translate_prefix(&path.pattern),
    }
}

fn translate_prefix(pattern: &str) -> Vec<String> {
    if pattern == "/" {
        return vec!["/*".to_string()];
    }

    let base = pattern.strip_suffix('/').unwrap_or(pattern);
    vec![base.to_string(), format!("{}/*", base)]
}

/// Translate every path of a descriptor, keeping declaration order.
pub fn translate_all<'a>(paths: impl IntoIterator<Item = &'a PathSpec>) -> Vec<String> {
    paths.into_iter().flat_map(translate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exact_is_unchanged() {
        assert_eq!(translate(&PathSpec::exact("/health")), vec!["/health"]);
        assert_eq!(translate(&PathSpec::exact("/")), vec!["/"]);
        assert_eq!(translate(&PathSpec::exact("/dir/")), vec!["/dir/"]);
    }

    #[test]
    fn root_prefix_is_single_wildcard() {
        assert_eq!(translate(&PathSpec::prefix("/")), vec!["/*"]);
    }

    #[test]
    fn trailing_slash_prefix_is_stripped() {
        assert_eq!(translate(&PathSpec::prefix("/static/")), vec!["/static", "/static/*"]);
    }

    #[test]
    fn plain_prefix_gets_wildcard_sibling() {
        assert_eq!(translate(&PathSpec::prefix("/api")), vec!["/api", "/api/*"]);
    }

    #[test]
    fn translate_all_keeps_order() {
        let paths = vec![PathSpec::prefix("/api"), PathSpec::exact("/health")];
        assert_eq!(translate_all(&paths), vec!["/api", "/api/*", "/health"]);
    }

    proptest! {
        #[test]
        fn trailing_slash_prefix_shape(segment in "[a-z0-9]{1,12}") {
            let pattern = format!("/{}/", segment);
            let expected_base = format!("/{}", segment);
            prop_assert_eq!(
                translate(&PathSpec::prefix(pattern)),
                vec![expected_base.clone(), format!("{}/*", expected_base)]
            );
        }

        #[test]
        fn prefix_always_yields_wildcard_last(segment in "/[a-z0-9/]{0,16}") {
            let patterns = translate(&PathSpec::prefix(segment));
            prop_assert!(patterns.last().unwrap().ends_with("/*"));
            prop_assert!(patterns.len() <= 2);
        }
    }
}
