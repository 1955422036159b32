// Copyright (c) 2024-present, helios-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A small glob matcher for `materialize`'s include/exclude filters.
//!
//! `*` matches any run of non-separator characters; `**` matches any run of
//! characters, including separators. Both apply across the full path
//! string, not per-segment — so `src/**` matches `src/deep/nested/file.go`
//! and `foo**` matches `foo_bar`.

/// Returns `true` if `path` matches `pattern`.
#[must_use]
pub fn matches(pattern: &str, path: &str) -> bool {
    match_from(pattern.as_bytes(), path.as_bytes())
}

fn match_from(pattern: &[u8], path: &[u8]) -> bool {
    match pattern.first() {
        None => path.is_empty(),

        Some(b'*') if pattern.get(1) == Some(&b'*') => {
            let rest = &pattern[2..];
            // `**` may match zero or more characters of any kind, including
            // separators: try every possible split point.
            for split in 0..=path.len() {
                if match_from(rest, &path[split..]) {
                    return true;
                }
            }
            false
        }

        Some(b'*') => {
            let rest = &pattern[1..];
            // `*` may match zero or more non-separator characters.
            for split in 0..=path.len() {
                if path[..split].contains(&b'/') {
                    break;
                }
                if match_from(rest, &path[split..]) {
                    return true;
                }
            }
            false
        }

        Some(&literal) => match path.first() {
            Some(&c) if c == literal => match_from(&pattern[1..], &path[1..]),
            _ => false,
        },
    }
}

/// Returns whether `path` should be materialized, given `include` and
/// `exclude` pattern lists.
///
/// An empty `include` list means "include all". A path is included if it
/// matches any `include` pattern (or the list is empty) and excluded if it
/// matches any `exclude` pattern; exclude wins on conflict.
#[must_use]
pub fn is_selected(path: &str, include: &[String], exclude: &[String]) -> bool {
    let included = include.is_empty() || include.iter().any(|pattern| matches(pattern, path));
    if !included {
        return false;
    }

    !exclude.iter().any(|pattern| matches(pattern, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn star_matches_within_a_segment() {
        assert!(matches("*.txt", "hello.txt"));
        assert!(!matches("*.txt", "dir/hello.txt"));
    }

    #[test]
    fn double_star_matches_across_segments() {
        assert!(matches("src/**", "src/deep/nested/file.go"));
        assert!(matches("src/**", "src/file.go"));
        assert!(!matches("src/**", "lib/file.go"));
    }

    #[test]
    fn prefix_double_star_is_permissive() {
        assert!(matches("foo**", "foo_bar"));
        assert!(matches("foo**", "foo"));
    }

    #[test]
    fn empty_include_means_include_all() {
        assert!(is_selected("anything/goes.rs", &[], &[]));
    }

    #[test]
    fn exclude_wins_on_conflict() {
        let include = vec!["a/**".to_string()];
        let exclude = vec!["a/**".to_string()];
        assert!(!is_selected("a/b.txt", &include, &exclude));
    }

    #[test]
    fn include_list_restricts_to_matching_paths() {
        let include = vec!["*.rs".to_string()];
        assert!(is_selected("main.rs", &include, &[]));
        assert!(!is_selected("main.go", &include, &[]));
    }
}
