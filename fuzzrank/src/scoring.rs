//! Scoring Adapter
//!
//! Wraps interchangeable scoring strategies behind one contract and
//! normalizes what they return into a `MatchResult`:
//!
//! - higher is always better (cost strategies are negated)
//! - positions are strictly increasing character indices into the original
//!   candidate, or empty
//! - candidates over the length ceiling get `MIN_SCORE` without calling the
//!   strategy
//! - strategies that only understand ASCII see a stripped copy; positions are
//!   mapped back through the strip table
//! - anchored patterns keep positions only when the first one is 0
//!
//! The active strategy is resolved once per request (`resolve_strategy`); a
//! strategy that was not compiled in fails the request instead of silently
//! switching to another ranking.

use crate::candidate::Candidate;
use crate::config::{Config, ScoringStrategyKind};
use crate::interface::{FuzzrankError, FuzzrankResult, MatchResult, MIN_SCORE};
use crate::strategies;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

// ═══════════════════════════════════════════════════════════════════════════════
// STRATEGY CONTRACT
// ═══════════════════════════════════════════════════════════════════════════════

/// What a strategy can report besides its score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Positions,
    ScoreOnly,
}

/// Native direction of a strategy's score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    HigherIsBetter,
    /// The strategy reports a cost
    LowerIsBetter,
}

/// Characters a strategy accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Unicode,
    Ascii,
}

/// Raw strategy output, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutput {
    WithPositions { score: f64, positions: Vec<usize> },
    ScoreOnly { score: f64 },
}

pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn capability(&self) -> Capability;

    fn polarity(&self) -> Polarity {
        Polarity::HigherIsBetter
    }

    fn encoding(&self) -> Encoding {
        Encoding::Unicode
    }

    /// Score `candidate` against `query`. `None` means no match.
    fn score(&self, candidate: &str, query: &str, cache: Option<&ScoreCache>) -> Option<StrategyOutput>;

    /// Score with the first query character pinned to the candidate start.
    /// Strategies that cannot pin the alignment keep the default; the adapter
    /// then drops positions that do not start at 0.
    fn score_anchored(&self, candidate: &str, query: &str, cache: Option<&ScoreCache>) -> Option<StrategyOutput> {
        self.score(candidate, query, cache)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Request-local store for per-candidate precomputation. Opaque to the
/// adapter; strategies key their own value types by candidate text.
/// Interior locking makes it usable from rayon workers within one request.
#[derive(Default)]
pub struct ScoreCache {
    entries: RwLock<HashMap<(TypeId, String), Arc<dyn Any + Send + Sync>>>,
}

impl ScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with<V, F>(&self, key: &str, init: F) -> Arc<V>
    where
        V: Any + Send + Sync,
        F: FnOnce() -> V,
    {
        let slot = (TypeId::of::<V>(), key.to_string());
        if let Some(hit) = self.entries.read().get(&slot) {
            if let Ok(value) = Arc::clone(hit).downcast::<V>() {
                return value;
            }
        }
        let value = Arc::new(init());
        self.entries
            .write()
            .entry(slot)
            .or_insert_with(|| value.clone() as Arc<dyn Any + Send + Sync>);
        value
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl std::fmt::Debug for ScoreCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreCache").field("entries", &self.len()).finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Whether a built-in strategy was compiled into this build
pub fn is_available(kind: ScoringStrategyKind) -> bool {
    match kind {
        ScoringStrategyKind::Subsequence
        | ScoringStrategyKind::EditCost
        | ScoringStrategyKind::Similarity => true,
        ScoringStrategyKind::Nucleo => cfg!(feature = "nucleo"),
        ScoringStrategyKind::Skim => cfg!(feature = "skim"),
    }
}

/// Resolve the configured built-in strategy. Unavailable strategies are an
/// error, never a fallback.
pub fn resolve_strategy(kind: ScoringStrategyKind, config: &Config) -> FuzzrankResult<Arc<dyn ScoringStrategy>> {
    let case_sensitive = config.case_sensitive;
    match kind {
        ScoringStrategyKind::Subsequence => Ok(Arc::new(strategies::SubsequenceScorer::new(case_sensitive))),
        ScoringStrategyKind::EditCost => Ok(Arc::new(strategies::EditCostScorer::new(case_sensitive))),
        ScoringStrategyKind::Similarity => Ok(Arc::new(strategies::SimilarityScorer::new(case_sensitive))),
        #[cfg(feature = "nucleo")]
        ScoringStrategyKind::Nucleo => Ok(Arc::new(strategies::NucleoScorer::new(case_sensitive))),
        #[cfg(feature = "skim")]
        ScoringStrategyKind::Skim => Ok(Arc::new(strategies::SkimScorer::new(case_sensitive))),
        #[allow(unreachable_patterns)]
        other => {
            tracing::warn!(strategy = ?other, "scoring strategy not compiled in");
            Err(FuzzrankError::StrategyUnavailable(format!(
                "{other:?} (enable the corresponding cargo feature)"
            )))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADAPTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Copy of a string without non-ASCII characters plus, for every kept char,
/// its character index in the original.
struct Stripped {
    text: String,
    origin: Vec<usize>,
}

fn strip_non_ascii(s: &str) -> Option<Stripped> {
    if s.is_ascii() {
        return None;
    }
    let mut text = String::with_capacity(s.len());
    let mut origin = Vec::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        if c.is_ascii() {
            text.push(c);
            origin.push(i);
        }
    }
    Some(Stripped { text, origin })
}

fn normalize(raw: f64, polarity: Polarity) -> f64 {
    let score = match polarity {
        Polarity::HigherIsBetter => raw,
        Polarity::LowerIsBetter => -raw,
    };
    if score.is_nan() {
        MIN_SCORE
    } else {
        score.clamp(f64::MIN, f64::MAX)
    }
}

fn positions_valid(positions: &[usize], len: usize) -> bool {
    positions.windows(2).all(|w| w[0] < w[1]) && positions.last().map_or(true, |&p| p < len)
}

pub struct ScoringAdapter {
    strategy: Arc<dyn ScoringStrategy>,
    capability: Capability,
    polarity: Polarity,
    encoding: Encoding,
    max_candidate_len: usize,
    anchored: bool,
    cache: Option<ScoreCache>,
}

impl ScoringAdapter {
    /// Capability tags are read once here and hold for the whole request
    pub fn new(strategy: Arc<dyn ScoringStrategy>, config: &Config) -> Self {
        Self {
            capability: strategy.capability(),
            polarity: strategy.polarity(),
            encoding: strategy.encoding(),
            strategy,
            max_candidate_len: config.max_candidate_len,
            anchored: false,
            cache: config.use_cache.then(ScoreCache::new),
        }
    }

    /// Require the first query character at candidate index 0
    pub fn anchored(mut self, anchored: bool) -> Self {
        self.anchored = anchored;
        self
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn cache(&self) -> Option<&ScoreCache> {
        self.cache.as_ref()
    }

    pub fn score<T>(&self, candidate: &Candidate<T>, query: &str) -> MatchResult {
        self.score_with_len(candidate.text(), candidate.char_len(), query)
    }

    pub fn score_text(&self, text: &str, query: &str) -> MatchResult {
        self.score_with_len(text, text.chars().count(), query)
    }

    fn score_with_len(&self, text: &str, char_len: usize, query: &str) -> MatchResult {
        if char_len > self.max_candidate_len {
            return MatchResult::sentinel();
        }

        let (stripped_text, stripped_query) = match self.encoding {
            Encoding::Unicode => (None, None),
            Encoding::Ascii => (strip_non_ascii(text), strip_non_ascii(query)),
        };
        let text_arg = stripped_text.as_ref().map_or(text, |s| s.text.as_str());
        let query_arg = stripped_query.as_ref().map_or(query, |s| s.text.as_str());

        let cache = self.cache.as_ref();
        let output = if self.anchored {
            self.strategy.score_anchored(text_arg, query_arg, cache)
        } else {
            self.strategy.score(text_arg, query_arg, cache)
        };
        let Some(output) = output else {
            return MatchResult::sentinel();
        };

        match output {
            StrategyOutput::ScoreOnly { score } => MatchResult { score: normalize(score, self.polarity), positions: Vec::new() },
            StrategyOutput::WithPositions { score, .. } if self.capability == Capability::ScoreOnly => {
                MatchResult { score: normalize(score, self.polarity), positions: Vec::new() }
            }
            StrategyOutput::WithPositions { score, positions } => {
                let positions = match &stripped_text {
                    None => Some(positions),
                    Some(s) => positions.iter().map(|&p| s.origin.get(p).copied()).collect(),
                };
                let positions = positions
                    .filter(|p| positions_valid(p, char_len))
                    .filter(|p| !self.anchored || p.first().map_or(true, |&first| first == 0))
                    .unwrap_or_default();
                MatchResult { score: normalize(score, self.polarity), positions }
            }
        }
    }
}

impl std::fmt::Debug for ScoringAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringAdapter")
            .field("strategy", &self.strategy.name())
            .field("max_candidate_len", &self.max_candidate_len)
            .field("anchored", &self.anchored)
            .field("cache", &self.cache)
            .finish()
    }
}
