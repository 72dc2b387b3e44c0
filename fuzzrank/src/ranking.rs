//! Ranking for scored candidates.
//!
//! Sort key, most to least important:
//! 1. score, descending (`f64::total_cmp`; the sentinel sorts last)
//! 2. the configured tie-break
//! 3. input order (the sort is stable)
//!
//! History ranks and character lengths are looked up once per entry before
//! sorting, never inside the comparator.

use crate::config::TieBreak;
use crate::interface::{ScoredCandidate, MIN_SCORE};
use crate::source::History;
use std::cmp::Ordering;

/// Precomputed per-entry sort key
#[derive(Debug, Clone, Copy)]
struct RankKey {
    score: f64,
    /// 0 = most recently used
    recency: Option<usize>,
    len: usize,
}

impl RankKey {
    fn new<T>(entry: &ScoredCandidate<T>, tie_break: TieBreak, history: Option<&dyn History>) -> Self {
        let needs_history = matches!(tie_break, TieBreak::Recency | TieBreak::RecencyThenShorter);
        Self {
            score: entry.score.unwrap_or(MIN_SCORE),
            recency: if needs_history { history.and_then(|h| h.rank_of(entry.text())) } else { None },
            len: entry.candidate.char_len(),
        }
    }
}

/// Present in history beats absent; earlier (more recent) beats later
fn by_recency(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare(a: &RankKey, b: &RankKey, tie_break: TieBreak) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| match tie_break {
        TieBreak::None => Ordering::Equal,
        TieBreak::ShorterFirst => a.len.cmp(&b.len),
        TieBreak::LongerFirst => b.len.cmp(&a.len),
        TieBreak::Recency => match (a.recency, b.recency) {
            (None, None) => a.len.cmp(&b.len),
            (x, y) => by_recency(x, y),
        },
        TieBreak::RecencyThenShorter => by_recency(a.recency, b.recency).then_with(|| a.len.cmp(&b.len)),
    })
}

/// Order scored entries best-first. Entries that compare equal keep their
/// relative input order.
pub fn rank<T>(
    entries: Vec<ScoredCandidate<T>>,
    tie_break: TieBreak,
    history: Option<&dyn History>,
) -> Vec<ScoredCandidate<T>> {
    let mut keyed: Vec<(RankKey, ScoredCandidate<T>)> = entries
        .into_iter()
        .map(|entry| (RankKey::new(&entry, tie_break, history), entry))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| compare(a, b, tie_break));
    keyed.into_iter().map(|(_, entry)| entry).collect()
}
