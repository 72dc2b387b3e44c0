//! Collaborator contracts: where candidates come from and what the user
//! picked before.
//!
//! The pipeline only reads sources. `ListSource` and `PathSource` are
//! in-memory implementations for hosts that already hold their collection
//! as a vector; `RecentHistory` is a bounded most-recent-first history.

use crate::candidate::Candidate;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::{HashSet, VecDeque};

/// Optional host predicate applied during enumeration
pub type Predicate<'a, T> = &'a (dyn Fn(&Candidate<T>) -> bool + Sync);

/// A read-only candidate collection.
pub trait CandidateSource<T> {
    /// Number of leading query characters that address the collection
    /// structurally (e.g. the directory part of a path). Flat collections
    /// report 0.
    fn boundary(&self, _query: &str) -> usize {
        0
    }

    /// Candidates under `prefix`, in collection order, relative to it.
    fn enumerate(&self, prefix: &str, predicate: Option<Predicate<'_, T>>) -> Vec<Candidate<T>>;

    /// Native fast path for the delegated filter strategy, when the source
    /// has one.
    fn fast_enumerator(&self) -> Option<&dyn FastEnumerate<T>> {
        None
    }
}

/// Enumeration primitive that filters with a compiled subsequence regex
/// without per-candidate pattern interpretation. Must agree with direct
/// filtering.
pub trait FastEnumerate<T> {
    fn enumerate_matching(
        &self,
        prefix: &str,
        infix: Option<&Regex>,
        predicate: Option<Predicate<'_, T>>,
    ) -> Vec<Candidate<T>>;
}

/// Ordered record of previously chosen candidates.
pub trait History {
    /// 0 = most recently used; `None` when never used
    fn rank_of(&self, candidate: &str) -> Option<usize>;
}

impl History for [String] {
    fn rank_of(&self, candidate: &str) -> Option<usize> {
        self.iter().position(|h| h == candidate)
    }
}

impl History for Vec<String> {
    fn rank_of(&self, candidate: &str) -> Option<usize> {
        self.as_slice().rank_of(candidate)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FLAT LIST
// ─────────────────────────────────────────────────────────────────────────────

/// Flat in-memory collection (buffer names, symbols, commands)
#[derive(Debug, Clone, Default)]
pub struct ListSource<T = ()> {
    items: Vec<Candidate<T>>,
}

impl<T> ListSource<T> {
    pub fn new(items: Vec<Candidate<T>>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ListSource<()> {
    pub fn from_strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(items.into_iter().map(|s| Candidate::new(s)).collect())
    }
}

fn keep<T>(candidate: &Candidate<T>, predicate: Option<Predicate<'_, T>>) -> bool {
    predicate.map_or(true, |p| p(candidate))
}

impl<T: Clone> CandidateSource<T> for ListSource<T> {
    fn enumerate(&self, prefix: &str, predicate: Option<Predicate<'_, T>>) -> Vec<Candidate<T>> {
        self.items
            .iter()
            .filter(|c| c.text().starts_with(prefix) && keep(c, predicate))
            .cloned()
            .collect()
    }

    fn fast_enumerator(&self) -> Option<&dyn FastEnumerate<T>> {
        Some(self)
    }
}

impl<T: Clone> FastEnumerate<T> for ListSource<T> {
    fn enumerate_matching(
        &self,
        prefix: &str,
        infix: Option<&Regex>,
        predicate: Option<Predicate<'_, T>>,
    ) -> Vec<Candidate<T>> {
        self.items
            .iter()
            .filter(|c| {
                c.text().starts_with(prefix)
                    && infix.map_or(true, |re| re.is_match(c.text()))
                    && keep(c, predicate)
            })
            .cloned()
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PATHS
// ─────────────────────────────────────────────────────────────────────────────

pub const PATH_SEPARATOR: char = '/';

/// Slash-separated paths. The query's directory part (up to and including
/// the last `/`) is the boundary; enumeration yields the immediate entries of
/// that directory, with subdirectories keeping their trailing `/`.
#[derive(Debug, Clone, Default)]
pub struct PathSource {
    paths: Vec<String>,
}

impl PathSource {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { paths: paths.into_iter().map(Into::into).collect() }
    }

    /// Entries directly under `dir`, deduplicated, in first-seen order
    fn entries<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let mut seen = HashSet::new();
        self.paths.iter().filter_map(move |path| {
            let rest = path.strip_prefix(dir)?;
            if rest.is_empty() {
                return None;
            }
            let entry = match rest.find(PATH_SEPARATOR) {
                Some(i) => &rest[..i + PATH_SEPARATOR.len_utf8()],
                None => rest,
            };
            seen.insert(entry).then_some(entry)
        })
    }
}

impl CandidateSource<()> for PathSource {
    fn boundary(&self, query: &str) -> usize {
        match query.rfind(PATH_SEPARATOR) {
            Some(i) => query[..i].chars().count() + 1,
            None => 0,
        }
    }

    fn enumerate(&self, prefix: &str, predicate: Option<Predicate<'_, ()>>) -> Vec<Candidate<()>> {
        self.entries(prefix)
            .map(Candidate::new)
            .filter(|c| keep(c, predicate))
            .collect()
    }

    fn fast_enumerator(&self) -> Option<&dyn FastEnumerate<()>> {
        Some(self)
    }
}

impl FastEnumerate<()> for PathSource {
    fn enumerate_matching(
        &self,
        prefix: &str,
        infix: Option<&Regex>,
        predicate: Option<Predicate<'_, ()>>,
    ) -> Vec<Candidate<()>> {
        self.entries(prefix)
            .filter(|entry| infix.map_or(true, |re| re.is_match(entry)))
            .map(Candidate::new)
            .filter(|c| keep(c, predicate))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HISTORY
// ─────────────────────────────────────────────────────────────────────────────

/// Bounded most-recent-first selection history
#[derive(Debug, Clone)]
pub struct RecentHistory {
    entries: VecDeque<(String, DateTime<Utc>)>,
    capacity: usize,
}

impl RecentHistory {
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// Record a selection now; moves an existing entry to the front
    pub fn record(&mut self, candidate: &str) {
        self.record_at(candidate, Utc::now());
    }

    pub fn record_at(&mut self, candidate: &str, when: DateTime<Utc>) {
        if self.capacity == 0 {
            return;
        }
        if let Some(i) = self.entries.iter().position(|(s, _)| s == candidate) {
            self.entries.remove(i);
        }
        self.entries.push_front((candidate.to_string(), when));
        self.entries.truncate(self.capacity);
    }

    pub fn last_used(&self, candidate: &str) -> Option<DateTime<Utc>> {
        self.entries.iter().find(|(s, _)| s == candidate).map(|(_, t)| *t)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl History for RecentHistory {
    fn rank_of(&self, candidate: &str) -> Option<usize> {
        self.entries.iter().position(|(s, _)| s == candidate)
    }
}
