//! Request configuration.
//!
//! One immutable `Config` value is built at request start and threaded
//! through every stage; nothing reads ambient mutable state mid-pipeline.

use crate::interface::{FuzzrankError, FuzzrankResult};
use serde::{Deserialize, Serialize};

/// Queries with more effective characters than this bypass scoring.
pub const DEFAULT_MAX_QUERY_LEN: usize = 30;

/// Candidates longer than this are capped at the sentinel score.
pub const DEFAULT_MAX_CANDIDATE_LEN: usize = 500;

/// Match counts above this are partitioned before scoring.
pub const DEFAULT_CANDIDATE_LIMIT: usize = 1000;

pub const DEFAULT_ANCHOR: char = '^';

/// Built-in scoring strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategyKind {
    /// Built-in subsequence DP with positions
    Subsequence,
    /// Levenshtein cost (lower is better), score-only, ASCII
    EditCost,
    /// Jaro-Winkler similarity, score-only
    Similarity,
    /// nucleo matcher (cargo feature `nucleo`)
    Nucleo,
    /// skim v2 matcher (cargo feature `skim`)
    Skim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStrategy {
    /// Subsequence test against every candidate
    Direct,
    /// Regex handed to the source's fast enumeration primitive
    Delegated,
}

/// Secondary ordering for equal scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep input order
    None,
    ShorterFirst,
    LongerFirst,
    /// More recently used first; shorter first when neither is in history
    Recency,
    /// Recency, then shorter first for any remaining tie
    RecencyThenShorter,
}

/// Ordering used to choose which matches of an oversized set get scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrePartition {
    ShorterFirst,
    LongerFirst,
    InputOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightMode {
    /// Strategy positions when present, pattern-derived otherwise
    Auto,
    /// Always re-derive spans from the pattern
    PatternOnly,
    /// Leave annotations as they are
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    pub max_query_len: usize,
    pub max_candidate_len: usize,
    pub candidate_limit: usize,
    pub case_sensitive: bool,
    pub anchor: char,
    pub scoring: ScoringStrategyKind,
    pub filter: FilterStrategy,
    pub tie_break: TieBreak,
    pub prepartition: PrePartition,
    pub highlight: HighlightMode,
    /// Scored entries below this are dropped from the result
    pub score_threshold: Option<f64>,
    /// Score candidates on the rayon pool
    pub parallel: bool,
    /// Hand a per-request `ScoreCache` to the strategy
    pub use_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_query_len: DEFAULT_MAX_QUERY_LEN,
            max_candidate_len: DEFAULT_MAX_CANDIDATE_LEN,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            case_sensitive: false,
            anchor: DEFAULT_ANCHOR,
            scoring: ScoringStrategyKind::Subsequence,
            filter: FilterStrategy::Direct,
            tie_break: TieBreak::RecencyThenShorter,
            prepartition: PrePartition::ShorterFirst,
            highlight: HighlightMode::Auto,
            score_threshold: None,
            parallel: false,
            use_cache: true,
        }
    }
}

impl Config {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> FuzzrankResult<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FuzzrankResult<()> {
        if self.candidate_limit == 0 {
            return Err(FuzzrankError::Config("candidate_limit must be at least 1".into()));
        }
        if self.max_candidate_len == 0 {
            return Err(FuzzrankError::Config("max_candidate_len must be at least 1".into()));
        }
        if let Some(threshold) = self.score_threshold {
            if threshold.is_nan() {
                return Err(FuzzrankError::Config("score_threshold must be a number".into()));
            }
        }
        Ok(())
    }
}
