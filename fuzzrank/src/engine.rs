//! Engine - runs one completion request through the pipeline:
//! filter → plan → score → rank → highlight.
//!
//! Cancellation: every request carries a `CancellationToken`, checked between
//! stages and between candidates while scoring. A cancelled request returns
//! `FuzzrankError::Cancelled` and never a partial list.
//!
//! Async callers use `complete_async`, which runs the pipeline on a blocking
//! thread. Dropping the returned future drops a DropGuard, which cancels the
//! request's token so the blocking thread bails out at its next checkpoint.

use crate::candidate::Candidate;
use crate::config::Config;
use crate::filter::{self, FilterOutput};
use crate::highlight;
use crate::interface::{FuzzrankError, FuzzrankResult, RankedList, ScoredCandidate};
use crate::pattern::Pattern;
use crate::query::Query;
use crate::ranking;
use crate::scaling::{self, Plan};
use crate::scoring::{self, ScoringAdapter, ScoringStrategy};
use crate::source::{CandidateSource, History, Predicate};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use std::sync::{Arc, Once};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Global fallback Tokio runtime for async calls made outside any runtime.
/// Shared by every engine and never dropped.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create fallback tokio runtime")
});

static RAYON_INIT: Once = Once::new();

/// Initialize the global Rayon pool, leaving headroom for Tokio workers
fn init_rayon() {
    RAYON_INIT.call_once(|| {
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let rayon_threads = num_threads.saturating_sub(2).max(1);

        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(rayon_threads)
            .thread_name(|i| format!("fuzzrank-rayon-{}", i))
            .build_global();
    });
}

fn runtime_handle() -> tokio::runtime::Handle {
    tokio::runtime::Handle::try_current().unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
}

/// RAII guard that cancels a token when dropped
struct DropGuard {
    token: CancellationToken,
}

impl DropGuard {
    fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[inline]
fn checkpoint(token: &CancellationToken, stage: &str) -> FuzzrankResult<()> {
    if token.is_cancelled() {
        debug!(stage, "Request cancelled");
        return Err(FuzzrankError::Cancelled);
    }
    Ok(())
}

/// A configured completion pipeline. Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct Engine {
    config: Config,
    strategy: Arc<dyn ScoringStrategy>,
    history: Option<Arc<dyn History + Send + Sync>>,
}

impl Engine {
    /// Validate `config` and resolve its scoring strategy.
    pub fn new(config: Config) -> FuzzrankResult<Self> {
        config.validate()?;
        let strategy = scoring::resolve_strategy(config.scoring, &config)?;
        if config.parallel {
            init_rayon();
        }
        Ok(Self { config, strategy, history: None })
    }

    /// Replace the configured strategy with a host-supplied one
    pub fn with_strategy(mut self, strategy: Arc<dyn ScoringStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// History consulted by the recency tie-breaks
    pub fn with_history(mut self, history: Arc<dyn History + Send + Sync>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn complete<T, S>(&self, source: &S, query: &str, token: &CancellationToken) -> FuzzrankResult<RankedList<T>>
    where
        T: Send,
        S: CandidateSource<T> + ?Sized,
    {
        self.complete_filtered(source, query, None, token)
    }

    /// Run the pipeline with an optional host predicate applied during
    /// enumeration.
    pub fn complete_filtered<T, S>(
        &self,
        source: &S,
        query: &str,
        predicate: Option<Predicate<'_, T>>,
        token: &CancellationToken,
    ) -> FuzzrankResult<RankedList<T>>
    where
        T: Send,
        S: CandidateSource<T> + ?Sized,
    {
        let config = &self.config;
        checkpoint(token, "start")?;

        #[cfg(feature = "perf-log")]
        let t0 = std::time::Instant::now();

        let query = Query::new(query, config);
        let FilterOutput { matches, pattern, prefix_len } = filter::filter(source, &query, config, predicate)?;
        let total_matches = matches.len();
        checkpoint(token, "filter")?;

        #[cfg(feature = "perf-log")]
        let t1 = std::time::Instant::now();

        let plan = scaling::plan(matches, &pattern, config);
        checkpoint(token, "plan")?;

        let (to_score, passthrough) = match plan {
            Plan::Unscored(all) => (Vec::new(), all),
            Plan::ScoreAll(all) => (all, Vec::new()),
            Plan::Partitioned { to_score, passthrough } => (to_score, passthrough),
        };

        #[cfg(feature = "perf-log")]
        let t2 = std::time::Instant::now();

        let scored = self.score(to_score, &pattern, token)?;
        checkpoint(token, "score")?;

        #[cfg(feature = "perf-log")]
        let t3 = std::time::Instant::now();

        let history = self.history.as_deref().map(|h| h as &dyn History);
        let mut ranked = ranking::rank(scored, config.tie_break, history);
        if let Some(threshold) = config.score_threshold {
            let before = ranked.len();
            ranked.retain(|e| e.score.map_or(true, |s| s >= threshold));
            debug!(threshold, dropped = before - ranked.len(), "Applied score threshold");
        }
        checkpoint(token, "rank")?;

        #[cfg(feature = "perf-log")]
        let t4 = std::time::Instant::now();

        let scored_count = ranked.len();
        let passthrough_count = passthrough.len();
        let mut entries = ranked;
        entries.extend(passthrough.into_iter().map(ScoredCandidate::unscored));
        highlight::highlight(Some(&pattern), &mut entries, config.highlight);
        checkpoint(token, "highlight")?;

        #[cfg(feature = "perf-log")]
        {
            let t5 = std::time::Instant::now();
            let ms = |a: std::time::Instant, b: std::time::Instant| (b - a).as_secs_f64() * 1000.0;
            eprintln!(
                "[perf] filter={:.1}ms plan={:.1}ms score={:.1}ms rank={:.1}ms highlight={:.1}ms matches={} scored={}",
                ms(t0, t1),
                ms(t1, t2),
                ms(t2, t3),
                ms(t3, t4),
                ms(t4, t5),
                total_matches,
                scored_count,
            );
        }

        debug!(
            strategy = self.strategy.name(),
            matches = total_matches,
            scored = scored_count,
            passthrough = passthrough_count,
            "Completion finished"
        );

        Ok(RankedList { entries, pattern, prefix_len, total_matches, scored_count, passthrough_count })
    }

    fn score<T: Send>(
        &self,
        candidates: Vec<Candidate<T>>,
        pattern: &Pattern,
        token: &CancellationToken,
    ) -> FuzzrankResult<Vec<ScoredCandidate<T>>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let query = pattern.infix();
        let adapter = ScoringAdapter::new(Arc::clone(&self.strategy), &self.config).anchored(pattern.is_anchored());
        let score_one = |candidate: Candidate<T>| {
            if token.is_cancelled() {
                return Err(FuzzrankError::Cancelled);
            }
            let result = adapter.score(&candidate, &query);
            Ok(ScoredCandidate::scored(candidate, result))
        };

        if self.config.parallel {
            // Indexed parallel collect keeps input order for the ranker
            candidates.into_par_iter().map(score_one).collect()
        } else {
            candidates.into_iter().map(score_one).collect()
        }
    }

    /// Run the pipeline on a blocking thread. The request is cancelled when
    /// `token` is cancelled or when the returned future is dropped.
    pub async fn complete_async<T, S>(
        &self,
        source: Arc<S>,
        query: impl Into<String>,
        token: CancellationToken,
    ) -> FuzzrankResult<RankedList<T>>
    where
        T: Send + 'static,
        S: CandidateSource<T> + Send + Sync + ?Sized + 'static,
    {
        let token = token.child_token();
        let _guard = DropGuard::new(token.clone());

        let engine = self.clone();
        let query = query.into();
        let handle = runtime_handle().spawn_blocking(move || engine.complete::<T, S>(source.as_ref(), &query, &token));

        match handle.await {
            Ok(result) => result,
            // JoinError: the blocking task panicked or was aborted
            Err(join_error) => {
                if join_error.is_panic() {
                    warn!(strategy = self.strategy.name(), "Completion task panicked");
                }
                Err(FuzzrankError::Cancelled)
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("strategy", &self.strategy.name())
            .field("history", &self.history.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ScoringStrategyKind, TieBreak};
    use crate::interface::HighlightKind;
    use crate::source::{ListSource, PathSource, RecentHistory};

    fn engine(config: Config) -> Engine {
        Engine::new(config).unwrap()
    }

    fn complete(config: Config, items: &[&str], q: &str) -> RankedList {
        let src = ListSource::from_strings(items.iter().copied());
        engine(config).complete(&src, q, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_basic_ranking() {
        let out = complete(Config::default(), &["aabbcc", "abc", "xabcx", "ccba"], "abc");
        assert_eq!(out.texts(), vec!["abc", "xabcx", "aabbcc"]);
        assert_eq!(out.total_matches, 3);
        assert_eq!(out.scored_count, 3);
        assert_eq!(out.passthrough_count, 0);
        let top = &out.entries[0];
        assert_eq!(top.positions, vec![0, 1, 2]);
        assert_eq!(top.highlights.len(), 1);
        assert_eq!(top.highlights[0].kind, HighlightKind::Matched);
    }

    #[test]
    fn test_cancelled_before_start() {
        let src = ListSource::from_strings(["abc"]);
        let token = CancellationToken::new();
        token.cancel();
        let err = engine(Config::default()).complete(&src, "a", &token).unwrap_err();
        assert!(matches!(err, FuzzrankError::Cancelled));
    }

    #[test]
    fn test_unavailable_strategy_fails_construction() {
        let config = Config { scoring: ScoringStrategyKind::Skim, ..Config::default() };
        let result = Engine::new(config);
        assert_eq!(result.is_ok(), scoring::is_available(ScoringStrategyKind::Skim));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config { candidate_limit: 0, ..Config::default() };
        assert!(matches!(Engine::new(config), Err(FuzzrankError::Config(_))));
    }

    #[test]
    fn test_passthrough_appended_unscored() {
        let config = Config { candidate_limit: 2, ..Config::default() };
        let out = complete(config, &["a_long_name", "ab", "a", "abc"], "a");
        assert_eq!(out.scored_count, 2);
        assert_eq!(out.passthrough_count, 2);
        // Passthrough keeps filter order and carries no score
        assert_eq!(&out.texts()[2..], &["a_long_name", "abc"]);
        assert!(out.entries[2..].iter().all(|e| e.score.is_none()));
        // ...but is still highlighted from the pattern
        assert!(out.entries[2..].iter().all(|e| !e.highlights.is_empty()));
    }

    #[test]
    fn test_score_threshold_drops_scored_only() {
        let strict = Config { score_threshold: Some(f64::MAX), ..Config::default() };
        let out = complete(strict, &["abc", "xabcx"], "abc");
        assert!(out.is_empty());
        assert_eq!(out.total_matches, 2);
    }

    #[test]
    fn test_recency_history() {
        let mut history = RecentHistory::new(8);
        history.record("bar");
        let config = Config { tie_break: TieBreak::Recency, scoring: ScoringStrategyKind::Similarity, ..Config::default() };
        let src = ListSource::from_strings(["bax", "bar"]);
        // Equal similarity against "ba", so history decides
        let out = engine(config)
            .with_history(Arc::new(history))
            .complete(&src, "ba", &CancellationToken::new())
            .unwrap();
        assert_eq!(out.texts(), vec!["bar", "bax"]);
    }

    #[test]
    fn test_paths_are_relative_to_prefix() {
        let src = PathSource::new(["src/main.rs", "src/lib.rs", "Cargo.toml"]);
        let out = engine(Config::default()).complete(&src, "src/lb", &CancellationToken::new()).unwrap();
        assert_eq!(out.texts(), vec!["lib.rs"]);
        assert_eq!(out.prefix_len, 4);
        assert_eq!(out.entries[0].positions, vec![0, 2]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let items: Vec<String> = (0..300).map(|i| format!("item_{i}_{}", "x".repeat(i % 7))).collect();
        let src = ListSource::from_strings(items.iter().cloned());
        let token = CancellationToken::new();
        let seq = engine(Config::default()).complete(&src, "i1x", &token).unwrap();
        let par = engine(Config { parallel: true, ..Config::default() }).complete(&src, "i1x", &token).unwrap();
        assert_eq!(seq.texts(), par.texts());
    }

    #[tokio::test]
    async fn test_async_completes() {
        let src = Arc::new(ListSource::from_strings(["alpha", "beta", "gamma"]));
        let out = engine(Config::default())
            .complete_async(src, "ga", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.texts(), vec!["gamma"]);
    }

    #[tokio::test]
    async fn test_async_cancelled_by_parent_token() {
        let src = Arc::new(ListSource::from_strings(["alpha"]));
        let token = CancellationToken::new();
        token.cancel();
        let err = engine(Config::default()).complete_async(src, "a", token).await.unwrap_err();
        assert!(matches!(err, FuzzrankError::Cancelled));
    }

    #[test]
    fn test_anchored_query_positions_start_at_zero() {
        let out = complete(Config::default(), &["a_ab", "axxab", "xab"], "^ab");
        assert_eq!(out.total_matches, 2);
        for entry in &out.entries {
            assert_eq!(entry.positions.first(), Some(&0), "{}", entry.text());
            assert_eq!(entry.highlights[0].start, 0);
        }
        let a_ab = out.entries.iter().find(|e| e.text() == "a_ab").unwrap();
        assert_eq!(a_ab.positions, vec![0, 3]);
    }

    /// Strategy that panics on every call
    struct Exploding;

    impl ScoringStrategy for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }
        fn capability(&self) -> scoring::Capability {
            scoring::Capability::ScoreOnly
        }
        fn score(&self, _: &str, _: &str, _: Option<&scoring::ScoreCache>) -> Option<scoring::StrategyOutput> {
            panic!("strategy failure");
        }
    }

    #[tokio::test]
    async fn test_async_strategy_panic_is_contained() {
        let src = Arc::new(ListSource::from_strings(["alpha"]));
        let base = engine(Config::default());
        let err = base
            .clone()
            .with_strategy(Arc::new(Exploding))
            .complete_async(Arc::clone(&src), "a", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FuzzrankError::Cancelled));

        let out = base.complete_async(src, "a", CancellationToken::new()).await.unwrap();
        assert_eq!(out.texts(), vec!["alpha"]);
    }

    #[test]
    fn test_dropguard_cancels_on_panic() {
        let token = CancellationToken::new();
        let token_clone = token.clone();

        let result = std::panic::catch_unwind(|| {
            let _guard = DropGuard::new(token_clone);
            panic!("Intentional panic to test unwinding");
        });

        assert!(result.is_err());
        assert!(token.is_cancelled());
    }
}
