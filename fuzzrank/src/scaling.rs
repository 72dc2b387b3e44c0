//! Scaling controller: decides how much of the match set gets scored.
//!
//! Scoring is the expensive stage. Long queries skip it altogether, and an
//! oversized match set only scores its `candidate_limit` most promising
//! members; the rest ride along unscored after the ranked group.

use crate::candidate::Candidate;
use crate::config::{Config, PrePartition};
use crate::pattern::Pattern;
use tracing::debug;

#[derive(Debug, Clone)]
pub enum Plan<T> {
    /// Return every match unscored, in filter order
    Unscored(Vec<Candidate<T>>),
    /// Score and rank everything
    ScoreAll(Vec<Candidate<T>>),
    /// Score `to_score`; append `passthrough` after the ranked group
    Partitioned {
        to_score: Vec<Candidate<T>>,
        passthrough: Vec<Candidate<T>>,
    },
}

impl<T> Plan<T> {
    pub fn scored_len(&self) -> usize {
        match self {
            Plan::Unscored(_) => 0,
            Plan::ScoreAll(all) => all.len(),
            Plan::Partitioned { to_score, .. } => to_score.len(),
        }
    }

    pub fn passthrough_len(&self) -> usize {
        match self {
            Plan::Unscored(all) => all.len(),
            Plan::ScoreAll(_) => 0,
            Plan::Partitioned { passthrough, .. } => passthrough.len(),
        }
    }
}

pub fn plan<T>(matches: Vec<Candidate<T>>, pattern: &Pattern, config: &Config) -> Plan<T> {
    if pattern.is_empty() {
        return Plan::Unscored(matches);
    }
    if pattern.infix_len() > config.max_query_len {
        debug!(
            query_len = pattern.infix_len(),
            max = config.max_query_len,
            "Query over length ceiling, skipping scoring"
        );
        return Plan::Unscored(matches);
    }
    if matches.len() <= config.candidate_limit {
        return Plan::ScoreAll(matches);
    }

    let limit = config.candidate_limit;
    let mut order: Vec<usize> = (0..matches.len()).collect();
    // `sort_by_key` is stable, so equal lengths keep input order
    match config.prepartition {
        PrePartition::ShorterFirst => order.sort_by_key(|&i| matches[i].char_len()),
        PrePartition::LongerFirst => order.sort_by_key(|&i| std::cmp::Reverse(matches[i].char_len())),
        PrePartition::InputOrder => {}
    }

    let mut selected = vec![false; matches.len()];
    for &i in &order[..limit] {
        selected[i] = true;
    }

    let (to_score, passthrough): (Vec<_>, Vec<_>) = matches
        .into_iter()
        .zip(selected)
        .partition(|(_, keep)| *keep);
    debug!(
        scored = to_score.len(),
        passthrough = passthrough.len(),
        "Match set over candidate limit, partitioned"
    );
    Plan::Partitioned {
        to_score: to_score.into_iter().map(|(c, _)| c).collect(),
        passthrough: passthrough.into_iter().map(|(c, _)| c).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;

    fn cands(items: &[&str]) -> Vec<Candidate> {
        items.iter().map(|s| Candidate::new(*s)).collect()
    }

    fn texts(v: &[Candidate]) -> Vec<&str> {
        v.iter().map(|c| c.text()).collect()
    }

    fn run(items: &[&str], q: &str, config: &Config) -> Plan<()> {
        plan(cands(items), &Pattern::compile(&Query::new(q, config)), config)
    }

    #[test]
    fn test_under_limit_scores_all() {
        let config = Config { candidate_limit: 3, ..Config::default() };
        assert!(matches!(run(&["a", "ab", "abc"], "a", &config), Plan::ScoreAll(v) if v.len() == 3));
    }

    #[test]
    fn test_limit_plus_one() {
        let config = Config { candidate_limit: 2, ..Config::default() };
        let Plan::Partitioned { to_score, passthrough } = run(&["aaa", "a", "aa"], "a", &config) else {
            panic!("expected partition");
        };
        // Two shortest get scored, in their original relative order
        assert_eq!(texts(&to_score), vec!["a", "aa"]);
        assert_eq!(texts(&passthrough), vec!["aaa"]);
    }

    #[test]
    fn test_prepartition_preferences() {
        let items = ["bbb", "a", "cc", "dddd"];
        let split = |prepartition: PrePartition| {
            let config = Config { candidate_limit: 2, prepartition, ..Config::default() };
            match run(&items, "x", &config) {
                Plan::Partitioned { to_score, passthrough } => (
                    texts(&to_score).join(","),
                    texts(&passthrough).join(","),
                ),
                other => panic!("expected partition, got {other:?}"),
            }
        };
        assert_eq!(split(PrePartition::ShorterFirst), ("a,cc".to_string(), "bbb,dddd".to_string()));
        assert_eq!(split(PrePartition::LongerFirst), ("bbb,dddd".to_string(), "a,cc".to_string()));
        assert_eq!(split(PrePartition::InputOrder), ("bbb,a".to_string(), "cc,dddd".to_string()));
    }

    #[test]
    fn test_query_ceiling() {
        let config = Config { max_query_len: 3, ..Config::default() };
        assert!(matches!(run(&["abcd"], "abc", &config), Plan::ScoreAll(_)));
        let plan = run(&["abcd", "xabcdx"], "abcd", &config);
        assert!(matches!(&plan, Plan::Unscored(v) if texts(v) == vec!["abcd", "xabcdx"]));
        assert_eq!(plan.scored_len(), 0);
        assert_eq!(plan.passthrough_len(), 2);
    }

    #[test]
    fn test_empty_query_unscored() {
        assert!(matches!(run(&["a", "b"], "", &Config::default()), Plan::Unscored(v) if v.len() == 2));
    }
}
