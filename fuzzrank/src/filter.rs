//! Candidate filter: split the query at the collection boundary, then keep the
//! candidates whose text contains the infix as a subsequence.

use crate::candidate::Candidate;
use crate::config::{Config, FilterStrategy};
use crate::interface::{FuzzrankError, FuzzrankResult};
use crate::pattern::Pattern;
use crate::query::Query;
use crate::source::{CandidateSource, FastEnumerate, Predicate};
use tracing::{debug, warn};

/// Matching subset plus what highlighting needs to re-derive spans
#[derive(Debug, Clone)]
pub struct FilterOutput<T> {
    /// Matches in collection order, relative to the prefix
    pub matches: Vec<Candidate<T>>,
    pub pattern: Pattern,
    pub prefix_len: usize,
}

/// Compile the query against the source's boundary. A boundary that does not
/// fit the query degrades to the unsplit pattern.
pub fn split_query<T, S>(source: &S, query: &Query) -> Pattern
where
    S: CandidateSource<T> + ?Sized,
{
    let boundary = source.boundary(&query.text());
    match Pattern::split(query, boundary) {
        Some(pattern) => pattern,
        None => {
            warn!(
                boundary,
                query_len = query.len(),
                "Collection boundary does not fit the query, matching the whole query as infix"
            );
            Pattern::compile(query)
        }
    }
}

pub fn filter<T, S>(
    source: &S,
    query: &Query,
    config: &Config,
    predicate: Option<Predicate<'_, T>>,
) -> FuzzrankResult<FilterOutput<T>>
where
    S: CandidateSource<T> + ?Sized,
{
    let pattern = split_query::<T, S>(source, query);
    match config.filter {
        FilterStrategy::Direct => Ok(direct(source, pattern, predicate)),
        FilterStrategy::Delegated => {
            let fast = source.fast_enumerator().ok_or_else(|| {
                FuzzrankError::FilterUnavailable("source has no fast enumeration primitive".to_string())
            })?;
            delegated(fast, pattern, predicate)
        }
    }
}

fn direct<T, S>(source: &S, pattern: Pattern, predicate: Option<Predicate<'_, T>>) -> FilterOutput<T>
where
    S: CandidateSource<T> + ?Sized,
{
    let mut matches = source.enumerate(pattern.prefix(), predicate);
    if !pattern.is_empty() {
        matches.retain(|c| pattern.matches(c.text()));
    }
    debug!(matches = matches.len(), prefix = pattern.prefix(), "Direct filter");
    FilterOutput { prefix_len: pattern.prefix_len(), matches, pattern }
}

fn delegated<T>(
    fast: &dyn FastEnumerate<T>,
    pattern: Pattern,
    predicate: Option<Predicate<'_, T>>,
) -> FuzzrankResult<FilterOutput<T>> {
    if pattern.is_empty() {
        let matches = fast.enumerate_matching(pattern.prefix(), None, predicate);
        return Ok(FilterOutput { prefix_len: pattern.prefix_len(), matches, pattern });
    }

    let infix = pattern.to_regex()?;
    let matches = confirm(&pattern, fast.enumerate_matching(pattern.prefix(), Some(&infix), predicate));
    if !matches.is_empty() || pattern.prefix().is_empty() {
        debug!(matches = matches.len(), prefix = pattern.prefix(), "Delegated filter");
        return Ok(FilterOutput { prefix_len: pattern.prefix_len(), matches, pattern });
    }

    // Nothing under the prefix: retry the infix against the whole collection
    let pattern = pattern.without_prefix();
    let matches = confirm(&pattern, fast.enumerate_matching("", Some(&infix), predicate));
    debug!(matches = matches.len(), "Delegated filter retried without prefix");
    Ok(FilterOutput { prefix_len: 0, matches, pattern })
}

/// Host primitives only promise regex semantics; keep what the matcher accepts
fn confirm<T>(pattern: &Pattern, mut matches: Vec<Candidate<T>>) -> Vec<Candidate<T>> {
    matches.retain(|c| pattern.matches(c.text()));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ListSource, PathSource};

    fn texts<T>(out: &FilterOutput<T>) -> Vec<&str> {
        out.matches.iter().map(|c| c.text()).collect()
    }

    fn run<S: CandidateSource<()> + ?Sized>(source: &S, q: &str, strategy: FilterStrategy) -> FuzzrankResult<FilterOutput<()>> {
        let config = Config { filter: strategy, ..Config::default() };
        filter(source, &Query::new(q, &config), &config, None)
    }

    /// Flat source reporting a fixed boundary, with no fast path
    struct Fixed {
        inner: ListSource,
        boundary: usize,
    }

    impl CandidateSource<()> for Fixed {
        fn boundary(&self, _query: &str) -> usize {
            self.boundary
        }

        fn enumerate(&self, prefix: &str, predicate: Option<Predicate<'_, ()>>) -> Vec<Candidate<()>> {
            self.inner.enumerate(prefix, predicate)
        }
    }

    #[test]
    fn test_direct_subsequence() {
        let src = ListSource::from_strings(["aabbcc", "abc", "xabcx", "ccba"]);
        let out = run(&src, "abc", FilterStrategy::Direct).unwrap();
        assert_eq!(texts(&out), vec!["aabbcc", "abc", "xabcx"]);
        assert_eq!(out.prefix_len, 0);
        assert_eq!(out.pattern.infix(), "abc");
    }

    #[test]
    fn test_empty_query_matches_all() {
        let src = ListSource::from_strings(["b", "a", "c"]);
        for strategy in [FilterStrategy::Direct, FilterStrategy::Delegated] {
            let out = run(&src, "", strategy).unwrap();
            assert_eq!(texts(&out), vec!["b", "a", "c"]);
        }
    }

    #[test]
    fn test_predicate_applies() {
        let src = ListSource::from_strings(["abc", "abcd", "xabc"]);
        let config = Config::default();
        let not_x = |c: &Candidate<()>| !c.text().starts_with('x');
        let out = filter(&src, &Query::new("abc", &config), &config, Some(&not_x)).unwrap();
        assert_eq!(texts(&out), vec!["abc", "abcd"]);
    }

    #[test]
    fn test_delegated_agrees_with_direct() {
        let src = ListSource::from_strings(["Makefile", "main.rs", "lib.rs", "mod.rs", "README.md"]);
        for q in ["m", "mr", "^m", "ma", "rs", "zz", "e.m"] {
            let direct = run(&src, q, FilterStrategy::Direct).unwrap();
            let delegated = run(&src, q, FilterStrategy::Delegated).unwrap();
            assert_eq!(texts(&direct), texts(&delegated), "query {q}");
        }
    }

    #[test]
    fn test_delegated_agrees_on_unicode_folding() {
        let src = ListSource::from_strings(["ſun", "sun", "İndex", "\u{212A}ey"]);
        for q in ["su", "ſ", "in", "k", "İ"] {
            let direct = run(&src, q, FilterStrategy::Direct).unwrap();
            let delegated = run(&src, q, FilterStrategy::Delegated).unwrap();
            assert_eq!(texts(&direct), texts(&delegated), "query {q}");
        }
        assert_eq!(texts(&run(&src, "su", FilterStrategy::Delegated).unwrap()), vec!["sun"]);
    }

    /// Fast primitive that ignores the regex and returns everything
    struct Loose(ListSource);

    impl CandidateSource<()> for Loose {
        fn enumerate(&self, prefix: &str, predicate: Option<Predicate<'_, ()>>) -> Vec<Candidate<()>> {
            self.0.enumerate(prefix, predicate)
        }

        fn fast_enumerator(&self) -> Option<&dyn FastEnumerate<()>> {
            Some(self)
        }
    }

    impl FastEnumerate<()> for Loose {
        fn enumerate_matching(
            &self,
            prefix: &str,
            _infix: Option<&regex::Regex>,
            predicate: Option<Predicate<'_, ()>>,
        ) -> Vec<Candidate<()>> {
            self.0.enumerate(prefix, predicate)
        }
    }

    #[test]
    fn test_delegated_keeps_only_matcher_hits() {
        let src = Loose(ListSource::from_strings(["abc", "xyz", "cab"]));
        let out = run(&src, "ab", FilterStrategy::Delegated).unwrap();
        assert_eq!(texts(&out), vec!["abc", "cab"]);
    }

    #[test]
    fn test_path_split() {
        let src = PathSource::new(["src/main.rs", "src/lib.rs", "src/bin/cli.rs", "README.md"]);
        let out = run(&src, "src/ma", FilterStrategy::Direct).unwrap();
        assert_eq!(texts(&out), vec!["main.rs"]);
        assert_eq!(out.prefix_len, 4);
        assert_eq!(out.pattern.prefix(), "src/");
        assert_eq!(out.pattern.infix(), "ma");

        let out = run(&src, "src/", FilterStrategy::Direct).unwrap();
        assert_eq!(texts(&out), vec!["main.rs", "lib.rs", "bin/"]);
    }

    #[test]
    fn test_delegated_retries_without_prefix() {
        let src = PathSource::new(["docs/guide.md", "readme.md"]);
        let out = run(&src, "docs/rd", FilterStrategy::Delegated).unwrap();
        assert_eq!(out.prefix_len, 0);
        assert_eq!(out.pattern.prefix(), "");
        assert_eq!(out.pattern.infix(), "rd");
        assert_eq!(texts(&out), vec!["readme.md"]);

        // A hit under the prefix does not retry
        let out = run(&src, "docs/gd", FilterStrategy::Delegated).unwrap();
        assert_eq!(out.prefix_len, 5);
        assert_eq!(texts(&out), vec!["guide.md"]);
    }

    #[test]
    fn test_delegated_without_fast_path_is_unavailable() {
        let src = Fixed { inner: ListSource::from_strings(["a"]), boundary: 0 };
        let err = run(&src, "a", FilterStrategy::Delegated).unwrap_err();
        assert!(matches!(err, FuzzrankError::FilterUnavailable(_)));
        assert_eq!(texts(&run(&src, "a", FilterStrategy::Direct).unwrap()), vec!["a"]);
    }

    #[test]
    fn test_bad_boundary_falls_back_to_whole_query() {
        let src = Fixed { inner: ListSource::from_strings(["abc", "xyz"]), boundary: 99 };
        let out = run(&src, "ac", FilterStrategy::Direct).unwrap();
        assert_eq!(out.prefix_len, 0);
        assert_eq!(out.pattern.infix(), "ac");
        assert_eq!(texts(&out), vec!["abc"]);
    }
}
