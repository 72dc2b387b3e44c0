//! fuzzrank command line
//!
//! Usage:
//!     fuzzrank rank <QUERY> [--input FILE] [--config FILE.json] [--paths] [--json] [--limit N]
//!     fuzzrank generate [--count N] [--seed S]
//!
//! `rank` reads candidates one per line (stdin by default). `generate` prints a
//! synthetic path corpus for benchmarking.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fuzzrank::{
    CancellationToken, CandidateSource, Config, Engine, HighlightKind, ListSource, PathSource, RankedList,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank candidates against a query
    Rank {
        query: String,

        /// Candidate file, one per line (defaults to stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Treat candidates as slash-separated paths
        #[arg(long)]
        paths: bool,

        /// Emit JSON instead of annotated lines
        #[arg(long)]
        json: bool,

        /// Print at most this many entries
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Print a synthetic path corpus
    Generate {
        #[arg(short = 'n', long, default_value_t = 10_000)]
        count: usize,

        #[arg(short, long, default_value_t = 42)]
        seed: u64,
    },
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    text: &'a str,
    score: Option<f64>,
    positions: &'a [usize],
    highlights: &'a [fuzzrank::HighlightRange],
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    prefix_len: usize,
    total_matches: usize,
    scored: usize,
    passthrough: usize,
    entries: Vec<JsonEntry<'a>>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match Args::parse().command {
        Command::Rank { query, input, config, paths, json, limit } => {
            rank(&query, input, config, paths, json, limit)
        }
        Command::Generate { count, seed } => generate(count, seed),
    }
}

fn read_lines(input: Option<PathBuf>) -> Result<Vec<String>> {
    let lines = match input {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?
            .lines()
            .map(str::to_string)
            .collect(),
        None => io::stdin().lock().lines().collect::<io::Result<Vec<_>>>()?,
    };
    Ok(lines.into_iter().filter(|l| !l.is_empty()).collect())
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let raw = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    Config::from_json(&raw).with_context(|| format!("Invalid configuration in {}", path.display()))
}

fn rank(
    query: &str,
    input: Option<PathBuf>,
    config: Option<PathBuf>,
    paths: bool,
    json: bool,
    limit: Option<usize>,
) -> Result<()> {
    let engine = Engine::new(load_config(config)?)?;
    let lines = read_lines(input)?;
    let source: Box<dyn CandidateSource<()>> = if paths {
        Box::new(PathSource::new(lines))
    } else {
        Box::new(ListSource::from_strings(lines))
    };

    let result = engine.complete(source.as_ref(), query, &CancellationToken::new())?;
    let shown = limit.unwrap_or(result.len()).min(result.len());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if json {
        serde_json::to_writer_pretty(&mut out, &json_output(&result, shown))?;
        writeln!(out)?;
    } else {
        for entry in &result.entries[..shown] {
            writeln!(out, "{}", annotate(entry.text(), &entry.highlights))?;
        }
    }
    out.flush()?;
    Ok(())
}

fn json_output(result: &RankedList, shown: usize) -> JsonOutput<'_> {
    JsonOutput {
        prefix_len: result.prefix_len,
        total_matches: result.total_matches,
        scored: result.scored_count,
        passthrough: result.passthrough_count,
        entries: result.entries[..shown]
            .iter()
            .map(|e| JsonEntry {
                text: e.text(),
                score: e.score,
                positions: &e.positions,
                highlights: &e.highlights,
            })
            .collect(),
    }
}

/// Wrap matched runs in `[` `]`
fn annotate(text: &str, highlights: &[fuzzrank::HighlightRange]) -> String {
    let mut out = String::with_capacity(text.len() + highlights.len() * 2);
    let mut spans = highlights.iter().filter(|h| h.kind == HighlightKind::Matched).peekable();
    for (i, c) in text.chars().enumerate() {
        if spans.peek().map_or(false, |h| h.start == i) {
            out.push('[');
        }
        out.push(c);
        if let Some(h) = spans.peek() {
            if h.end == i + 1 {
                out.push(']');
                spans.next();
            }
        }
    }
    out
}

const DIRS: &[&str] = &["src", "tests", "benches", "docs", "assets", "scripts", "config", "vendor"];
const SUBDIRS: &[&str] = &["core", "util", "net", "ui", "storage", "bin", "model", "parser"];
const STEMS: &[&str] = &[
    "main", "lib", "config", "server", "client", "handler", "reader", "writer", "cache", "index",
    "query", "render", "layout", "token", "session", "schema",
];
const EXTS: &[&str] = &["rs", "toml", "md", "json", "txt", "yaml"];

fn generate(count: usize, seed: u64) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for i in 0..count {
        let dir = DIRS[rng.gen_range(0..DIRS.len())];
        let stem = STEMS[rng.gen_range(0..STEMS.len())];
        let ext = EXTS[rng.gen_range(0..EXTS.len())];
        if rng.gen_range(0..3) == 0 {
            writeln!(out, "{dir}/{stem}_{i}.{ext}")?;
        } else {
            let sub = SUBDIRS[rng.gen_range(0..SUBDIRS.len())];
            writeln!(out, "{dir}/{sub}/{stem}_{i}.{ext}")?;
        }
    }
    out.flush()?;
    Ok(())
}
