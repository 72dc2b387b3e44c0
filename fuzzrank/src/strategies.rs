//! Built-in scoring strategies.
//!
//! `SubsequenceScorer` is the default: an alignment DP over the candidate
//! that rewards word/path boundaries and consecutive runs and penalizes gaps.
//! The others wrap third-party metrics with different cost/quality
//! tradeoffs; `NucleoScorer` and `SkimScorer` are behind cargo features.

use crate::pattern::fold;
use crate::scoring::{Capability, Encoding, Polarity, ScoreCache, ScoringStrategy, StrategyOutput};

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSEQUENCE DP
// ═══════════════════════════════════════════════════════════════════════════════

const SCORE_MATCH: i32 = 16;
const BONUS_CONSECUTIVE: i32 = 12;
/// First character of the candidate
const BONUS_START: i32 = 10;
/// Right after `/`
const BONUS_PATH: i32 = 9;
/// Right after `_ - . : space`
const BONUS_WORD: i32 = 8;
/// Lower-to-upper transition (`fooBar`)
const BONUS_CAMEL: i32 = 7;
const PENALTY_GAP_OPEN: i32 = 3;
const PENALTY_GAP_EXTEND: i32 = 1;
/// Cap for the penalty on unmatched leading characters
const PENALTY_LEADING_MAX: i32 = 6;

const NONE: i32 = i32::MIN / 2;
const NO_PRED: u32 = u32::MAX;

/// Per-candidate structure reused through the request cache
#[derive(Debug)]
pub(crate) struct Segmented {
    folded: Vec<char>,
    bonus: Vec<i32>,
}

impl Segmented {
    fn new(text: &str, case_sensitive: bool) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let bonus = chars
            .iter()
            .enumerate()
            .map(|(i, &c)| match i.checked_sub(1).map(|p| chars[p]) {
                None => BONUS_START,
                Some('/') => BONUS_PATH,
                Some('_' | '-' | '.' | ':' | ' ') => BONUS_WORD,
                Some(prev) if prev.is_lowercase() && c.is_uppercase() => BONUS_CAMEL,
                Some(prev) if !prev.is_alphanumeric() && c.is_alphanumeric() => BONUS_WORD,
                Some(_) => 0,
            })
            .collect();
        Self {
            folded: chars.iter().map(|&c| fold(c, case_sensitive)).collect(),
            bonus,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SubsequenceScorer {
    case_sensitive: bool,
}

impl SubsequenceScorer {
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }

    /// Best alignment of `query` in the segmented candidate: (score, positions).
    /// `anchored` pins `query[0]` to candidate index 0.
    fn align(&self, seg: &Segmented, query: &[char], anchored: bool) -> Option<(i32, Vec<usize>)> {
        let n = seg.folded.len();
        let m = query.len();
        if m == 0 {
            return Some((0, Vec::new()));
        }
        if m > n {
            return None;
        }

        // score[i * n + j]: best score with query[i] matched at candidate[j]
        let mut score = vec![NONE; m * n];
        let mut pred = vec![NO_PRED; m * n];

        let first_row = if anchored { 1 } else { n };
        for j in 0..first_row {
            if seg.folded[j] == query[0] {
                let leading = (j as i32).min(PENALTY_LEADING_MAX);
                score[j] = SCORE_MATCH + seg.bonus[j] - leading;
            }
        }

        for i in 1..m {
            let prev_row = (i - 1) * n;
            let row = i * n;
            // Best predecessor at least one unmatched char behind j, with its
            // gap penalty already applied
            let mut gap_best = NONE;
            let mut gap_from = NO_PRED;
            for j in i..n {
                if j >= 2 {
                    let k = j - 2;
                    let opened = score[prev_row + k].saturating_sub(PENALTY_GAP_OPEN);
                    let extended = gap_best.saturating_sub(PENALTY_GAP_EXTEND);
                    if score[prev_row + k] > NONE && opened >= extended {
                        gap_best = opened;
                        gap_from = k as u32;
                    } else if gap_best > NONE {
                        gap_best = extended;
                    }
                }
                if seg.folded[j] != query[i] {
                    continue;
                }
                let consecutive = score[prev_row + j - 1];
                let here = SCORE_MATCH + seg.bonus[j];
                if consecutive > NONE && consecutive + BONUS_CONSECUTIVE >= gap_best {
                    score[row + j] = here + consecutive + BONUS_CONSECUTIVE;
                    pred[row + j] = (j - 1) as u32;
                } else if gap_best > NONE {
                    score[row + j] = here + gap_best;
                    pred[row + j] = gap_from;
                }
            }
        }

        let last = (m - 1) * n;
        let (mut j, best) = (0..n)
            .map(|j| (j, score[last + j]))
            .filter(|&(_, s)| s > NONE)
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))?;

        let mut positions = vec![0; m];
        for i in (0..m).rev() {
            positions[i] = j;
            if i > 0 {
                j = pred[i * n + j] as usize;
            }
        }
        Some((best, positions))
    }
}

impl ScoringStrategy for SubsequenceScorer {
    fn name(&self) -> &'static str {
        "subsequence"
    }

    fn capability(&self) -> Capability {
        Capability::Positions
    }

    fn score(&self, candidate: &str, query: &str, cache: Option<&ScoreCache>) -> Option<StrategyOutput> {
        self.run(candidate, query, cache, false)
    }

    fn score_anchored(&self, candidate: &str, query: &str, cache: Option<&ScoreCache>) -> Option<StrategyOutput> {
        self.run(candidate, query, cache, true)
    }
}

impl SubsequenceScorer {
    fn run(&self, candidate: &str, query: &str, cache: Option<&ScoreCache>, anchored: bool) -> Option<StrategyOutput> {
        let query: Vec<char> = query.chars().map(|c| fold(c, self.case_sensitive)).collect();
        let (score, positions) = match cache {
            Some(cache) => {
                let seg = cache.get_or_insert_with(candidate, || Segmented::new(candidate, self.case_sensitive));
                self.align(&seg, &query, anchored)?
            }
            None => self.align(&Segmented::new(candidate, self.case_sensitive), &query, anchored)?,
        };
        Some(StrategyOutput::WithPositions { score: f64::from(score), positions })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EDIT COST (triple_accel)
// ═══════════════════════════════════════════════════════════════════════════════

/// Fewest edits needed to find the query inside the candidate. A cost:
/// lower is better. Works on bytes, so it only accepts ASCII.
#[derive(Debug, Clone, Copy)]
pub struct EditCostScorer {
    case_sensitive: bool,
}

impl EditCostScorer {
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }
}

impl ScoringStrategy for EditCostScorer {
    fn name(&self) -> &'static str {
        "edit-cost"
    }

    fn capability(&self) -> Capability {
        Capability::ScoreOnly
    }

    fn polarity(&self) -> Polarity {
        Polarity::LowerIsBetter
    }

    fn encoding(&self) -> Encoding {
        Encoding::Ascii
    }

    fn score(&self, candidate: &str, query: &str, _cache: Option<&ScoreCache>) -> Option<StrategyOutput> {
        if query.is_empty() {
            return Some(StrategyOutput::ScoreOnly { score: 0.0 });
        }
        let (needle, haystack) = if self.case_sensitive {
            (query.as_bytes().to_vec(), candidate.as_bytes().to_vec())
        } else {
            (query.to_ascii_lowercase().into_bytes(), candidate.to_ascii_lowercase().into_bytes())
        };
        let cost = triple_accel::levenshtein::levenshtein_search(&needle, &haystack)
            .map(|m| m.k)
            .min()
            .unwrap_or(needle.len() as u32);
        Some(StrategyOutput::ScoreOnly { score: f64::from(cost) })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIMILARITY (strsim)
// ═══════════════════════════════════════════════════════════════════════════════

/// Jaro-Winkler similarity in `[0, 1]`; favours shared prefixes
#[derive(Debug, Clone, Copy)]
pub struct SimilarityScorer {
    case_sensitive: bool,
}

impl SimilarityScorer {
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }
}

impl ScoringStrategy for SimilarityScorer {
    fn name(&self) -> &'static str {
        "similarity"
    }

    fn capability(&self) -> Capability {
        Capability::ScoreOnly
    }

    fn score(&self, candidate: &str, query: &str, _cache: Option<&ScoreCache>) -> Option<StrategyOutput> {
        let score = if self.case_sensitive {
            strsim::jaro_winkler(query, candidate)
        } else {
            strsim::jaro_winkler(&query.to_lowercase(), &candidate.to_lowercase())
        };
        Some(StrategyOutput::ScoreOnly { score })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NUCLEO
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "nucleo")]
pub use self::nucleo::NucleoScorer;

#[cfg(feature = "nucleo")]
mod nucleo {
    use super::*;
    use nucleo_matcher::pattern::{Atom, AtomKind, CaseMatching, Normalization};
    use nucleo_matcher::{Config, Matcher, Utf32Str};
    use parking_lot::Mutex;

    struct State {
        matcher: Matcher,
        /// Last compiled query; the adapter calls with one query per request
        atom: Option<(String, Atom)>,
    }

    pub struct NucleoScorer {
        state: Mutex<State>,
        case: CaseMatching,
    }

    impl NucleoScorer {
        pub fn new(case_sensitive: bool) -> Self {
            Self {
                state: Mutex::new(State { matcher: Matcher::new(Config::DEFAULT), atom: None }),
                case: if case_sensitive { CaseMatching::Respect } else { CaseMatching::Ignore },
            }
        }
    }

    impl ScoringStrategy for NucleoScorer {
        fn name(&self) -> &'static str {
            "nucleo"
        }

        fn capability(&self) -> Capability {
            Capability::Positions
        }

        fn score(&self, candidate: &str, query: &str, _cache: Option<&ScoreCache>) -> Option<StrategyOutput> {
            let mut guard = self.state.lock();
            let State { matcher, atom } = &mut *guard;
            if atom.as_ref().map_or(true, |(q, _)| q != query) {
                let compiled = Atom::new(query, self.case, Normalization::Smart, AtomKind::Fuzzy, false);
                *atom = Some((query.to_string(), compiled));
            }
            let (_, atom) = atom.as_ref()?;

            let mut buf = Vec::new();
            let haystack = Utf32Str::new(candidate, &mut buf);
            let mut indices = Vec::new();
            let score = atom.indices(haystack, matcher, &mut indices)?;

            let mut positions: Vec<usize> = indices.into_iter().map(|i| i as usize).collect();
            positions.sort_unstable();
            positions.dedup();
            Some(StrategyOutput::WithPositions { score: f64::from(score), positions })
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SKIM
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "skim")]
pub use self::skim::SkimScorer;

#[cfg(feature = "skim")]
mod skim {
    use super::*;
    use fuzzy_matcher::skim::SkimMatcherV2;
    use fuzzy_matcher::FuzzyMatcher;

    pub struct SkimScorer {
        matcher: SkimMatcherV2,
    }

    impl SkimScorer {
        pub fn new(case_sensitive: bool) -> Self {
            let matcher = SkimMatcherV2::default();
            let matcher = if case_sensitive { matcher.respect_case() } else { matcher.ignore_case() };
            Self { matcher }
        }
    }

    impl ScoringStrategy for SkimScorer {
        fn name(&self) -> &'static str {
            "skim"
        }

        fn capability(&self) -> Capability {
            Capability::Positions
        }

        fn score(&self, candidate: &str, query: &str, _cache: Option<&ScoreCache>) -> Option<StrategyOutput> {
            let (score, positions) = self.matcher.fuzzy_indices(candidate, query)?;
            Some(StrategyOutput::WithPositions { score: score as f64, positions })
        }
    }
}
