//! fuzzrank - fuzzy completion core
//!
//! Turns a query and a candidate collection into a ranked, highlighted list:
//! subsequence filter → scaling plan → pluggable scoring → stable ranking →
//! highlight spans. `Engine` drives one request end to end; the stages are
//! public for hosts that want to compose them differently.

pub mod candidate;
pub mod config;
pub mod engine;
pub mod filter;
pub mod highlight;
pub mod interface;
pub mod pattern;
pub mod query;
pub mod ranking;
pub mod scaling;
pub mod scoring;
pub mod source;
pub mod strategies;

pub use candidate::Candidate;
pub use config::{Config, FilterStrategy, HighlightMode, PrePartition, ScoringStrategyKind, TieBreak};
pub use engine::Engine;
pub use interface::*;
pub use pattern::Pattern;
pub use query::Query;
pub use scoring::{Capability, Encoding, Polarity, ScoreCache, ScoringStrategy, StrategyOutput};
pub use source::{CandidateSource, FastEnumerate, History, ListSource, PathSource, RecentHistory};
pub use tokio_util::sync::CancellationToken;
