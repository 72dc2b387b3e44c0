//! fuzzrank public interface
//!
//! Records shared by every pipeline stage and handed back to the host.
//! Annotation (highlight spans) travels beside the candidate string and never
//! modifies it.

use crate::candidate::Candidate;
use crate::pattern::Pattern;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel score for candidates that were capped or not matched by the
/// scoring strategy. Sorts below every normalized score.
pub const MIN_SCORE: f64 = f64::NEG_INFINITY;

// ═══════════════════════════════════════════════════════════════════════════════
// HIGHLIGHTS
// ═══════════════════════════════════════════════════════════════════════════════

/// What a highlight span marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    /// A contiguous run of matched characters
    Matched,
    /// The single cell right after the last matched run
    FirstDifference,
}

/// A highlight range `[start, end)` in characters of the candidate text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRange {
    pub start: usize,
    pub end: usize,
    pub kind: HighlightKind,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Normalized output of the scoring adapter: higher is better, positions are
/// strictly increasing character indices (empty for score-only strategies).
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub score: f64,
    pub positions: Vec<usize>,
}

impl MatchResult {
    pub fn sentinel() -> Self {
        Self { score: MIN_SCORE, positions: Vec::new() }
    }

    pub fn is_sentinel(&self) -> bool {
        self.score == MIN_SCORE
    }
}

/// A candidate travelling through ranking and highlighting
#[derive(Debug, Clone)]
pub struct ScoredCandidate<T = ()> {
    pub candidate: Candidate<T>,
    /// `None` when the candidate bypassed scoring (query too long/empty, or
    /// passthrough tail of an oversized set)
    pub score: Option<f64>,
    pub positions: Vec<usize>,
    pub highlights: Vec<HighlightRange>,
}

impl<T> ScoredCandidate<T> {
    pub fn unscored(candidate: Candidate<T>) -> Self {
        Self { candidate, score: None, positions: Vec::new(), highlights: Vec::new() }
    }

    pub fn scored(candidate: Candidate<T>, result: MatchResult) -> Self {
        Self {
            candidate,
            score: Some(result.score),
            positions: result.positions,
            highlights: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        self.candidate.text()
    }
}

/// Pipeline output for one request
#[derive(Debug, Clone)]
pub struct RankedList<T = ()> {
    /// Scored-and-ranked entries first, then the unscored passthrough tail
    pub entries: Vec<ScoredCandidate<T>>,
    /// The pattern the filter used; drives pattern-based highlighting
    pub pattern: Pattern,
    /// Characters of the query consumed by the collection boundary
    pub prefix_len: usize,
    /// Candidates that passed the filter
    pub total_matches: usize,
    pub scored_count: usize,
    pub passthrough_count: usize,
}

impl<T> RankedList<T> {
    pub fn texts(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.text()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Error type for fuzzrank operations
#[derive(Debug, Error)]
pub enum FuzzrankError {
    #[error("Scoring strategy unavailable: {0}")]
    StrategyUnavailable(String),
    #[error("Filter strategy unavailable: {0}")]
    FilterUnavailable(String),
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for FuzzrankError {
    fn from(e: serde_json::Error) -> Self {
        FuzzrankError::Config(e.to_string())
    }
}

pub type FuzzrankResult<T> = Result<T, FuzzrankError>;
