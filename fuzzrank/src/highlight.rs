//! Highlight spans for rendering.
//!
//! Spans are character ranges into the candidate text, carried beside it in
//! `ScoredCandidate::highlights`. Each contiguous run of matched characters is
//! one `Matched` span; the cell right after the last run is marked
//! `FirstDifference` when it exists.

use crate::config::HighlightMode;
use crate::interface::{HighlightKind, HighlightRange, ScoredCandidate};
use crate::pattern::Pattern;

/// Spans for strictly increasing `positions` in a text of `len` characters
pub fn highlight_positions(positions: &[usize], len: usize) -> Vec<HighlightRange> {
    let Some((&first, rest)) = positions.split_first() else {
        return Vec::new();
    };

    let mut spans = rest.iter().fold(vec![(first, first + 1)], |mut acc, &idx| {
        match acc.last_mut() {
            Some(run) if idx == run.1 => run.1 = idx + 1,
            _ => acc.push((idx, idx + 1)),
        }
        acc
    })
    .into_iter()
    .map(|(start, end)| HighlightRange { start, end, kind: HighlightKind::Matched })
    .collect::<Vec<_>>();

    let next = positions[positions.len() - 1] + 1;
    if next < len {
        spans.push(HighlightRange { start: next, end: next + 1, kind: HighlightKind::FirstDifference });
    }
    spans
}

/// Re-derive spans from the pattern alone. Empty when the pattern is empty or
/// does not match.
pub fn highlight_pattern(pattern: &Pattern, text: &str) -> Vec<HighlightRange> {
    if pattern.is_empty() {
        return Vec::new();
    }
    pattern
        .find_positions(text)
        .map(|positions| highlight_positions(&positions, text.chars().count()))
        .unwrap_or_default()
}

/// Annotate `entries` in place according to `mode`.
pub fn highlight<T>(pattern: Option<&Pattern>, entries: &mut [ScoredCandidate<T>], mode: HighlightMode) {
    match mode {
        HighlightMode::Off => {}
        HighlightMode::PatternOnly => {
            for entry in entries.iter_mut() {
                entry.highlights = by_pattern(pattern, entry.text());
            }
        }
        HighlightMode::Auto => {
            for entry in entries.iter_mut() {
                entry.highlights = if entry.positions.is_empty() {
                    by_pattern(pattern, entry.text())
                } else {
                    highlight_positions(&entry.positions, entry.candidate.char_len())
                };
            }
        }
    }
}

fn by_pattern(pattern: Option<&Pattern>, text: &str) -> Vec<HighlightRange> {
    pattern.map(|p| highlight_pattern(p, text)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;
    use crate::config::Config;
    use crate::interface::MatchResult;
    use crate::query::Query;

    fn matched(start: usize, end: usize) -> HighlightRange {
        HighlightRange { start, end, kind: HighlightKind::Matched }
    }

    fn diff(at: usize) -> HighlightRange {
        HighlightRange { start: at, end: at + 1, kind: HighlightKind::FirstDifference }
    }

    fn pat(q: &str) -> Pattern {
        Pattern::compile(&Query::new(q, &Config::default()))
    }

    #[test]
    fn test_runs_become_spans() {
        let spans = highlight_positions(&[0, 1, 2, 5, 6, 10], 20);
        assert_eq!(spans, vec![matched(0, 3), matched(5, 7), matched(10, 11), diff(11)]);
    }

    #[test]
    fn test_no_first_difference_at_end() {
        assert_eq!(highlight_positions(&[1, 2], 3), vec![matched(1, 3)]);
        assert!(highlight_positions(&[], 3).is_empty());
    }

    #[test]
    fn test_pattern_driven() {
        assert_eq!(highlight_pattern(&pat("mr"), "main.rs"), vec![matched(0, 1), matched(5, 6), diff(6)]);
        assert!(highlight_pattern(&pat("zz"), "main.rs").is_empty());
        assert!(highlight_pattern(&pat(""), "main.rs").is_empty());
    }

    #[test]
    fn test_pattern_driven_is_idempotent_and_clears() {
        let mut entries = vec![ScoredCandidate::unscored(Candidate::new("xabc"))];
        entries[0].highlights = vec![matched(0, 4)];
        let p = pat("ab");
        highlight(Some(&p), &mut entries, HighlightMode::PatternOnly);
        let first = entries[0].highlights.clone();
        highlight(Some(&p), &mut entries, HighlightMode::PatternOnly);
        assert_eq!(entries[0].highlights, first);
        assert_eq!(first, vec![matched(1, 3), diff(3)]);

        highlight(None, &mut entries, HighlightMode::PatternOnly);
        assert!(entries[0].highlights.is_empty());
    }

    #[test]
    fn test_auto_prefers_positions() {
        let mut entries = vec![
            ScoredCandidate::scored(Candidate::new("a_b_c"), MatchResult { score: 1.0, positions: vec![2, 4] }),
            ScoredCandidate::unscored(Candidate::new("a_b_c")),
        ];
        highlight(Some(&pat("ab")), &mut entries, HighlightMode::Auto);
        assert_eq!(entries[0].highlights, vec![matched(2, 3), matched(4, 5)]);
        assert_eq!(entries[1].highlights, vec![matched(0, 1), matched(2, 3), diff(3)]);
    }

    #[test]
    fn test_off_leaves_annotations() {
        let mut entries = vec![ScoredCandidate::unscored(Candidate::new("abc"))];
        entries[0].highlights = vec![matched(0, 1)];
        highlight(Some(&pat("c")), &mut entries, HighlightMode::Off);
        assert_eq!(entries[0].highlights, vec![matched(0, 1)]);
    }

    #[test]
    fn test_char_offsets() {
        assert_eq!(highlight_pattern(&pat("b"), "ébc"), vec![matched(1, 2), diff(2)]);
    }
}
