//! Pattern Matcher
//!
//! A `Pattern` is the structural form of a query: the infix characters must
//! appear in order (not necessarily contiguous) in a candidate. The optional
//! prefix is the literal leading segment that addressed a hierarchical
//! collection (e.g. `src/` in `src/ma`); it is never matched against the
//! candidate itself because candidates are enumerated relative to it.

use crate::query::Query;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    prefix: String,
    infix: Vec<char>,
    /// `infix` after case folding; what candidates are compared against
    atoms: Vec<char>,
    anchored: bool,
    case_sensitive: bool,
}

#[inline]
pub(crate) fn fold(c: char, case_sensitive: bool) -> char {
    if case_sensitive {
        c
    } else if c.is_ascii() {
        c.to_ascii_lowercase()
    } else {
        c.to_lowercase().next().unwrap_or(c)
    }
}

/// For every case-folded char, the other chars that fold onto it
/// (`a` -> `A`, `i` -> `I İ`)
static FOLD_SOURCES: Lazy<HashMap<char, Vec<char>>> = Lazy::new(|| {
    let mut table: HashMap<char, Vec<char>> = HashMap::new();
    for c in (0..=char::MAX as u32).filter_map(char::from_u32) {
        let folded = fold(c, false);
        if folded != c {
            table.entry(folded).or_default().push(c);
        }
    }
    table
});

impl Pattern {
    /// Compile a query with no boundary split: the whole query is infix.
    pub fn compile(query: &Query) -> Self {
        Self::build(String::new(), query.chars(), query.is_anchored(), query.is_case_sensitive())
    }

    /// Compile a query split at `prefix_len` characters. Returns `None` when
    /// the boundary does not fit the query.
    pub fn split(query: &Query, prefix_len: usize) -> Option<Self> {
        if prefix_len > query.len() {
            return None;
        }
        let (prefix, infix) = query.chars().split_at(prefix_len);
        Some(Self::build(
            prefix.iter().collect(),
            infix,
            query.is_anchored(),
            query.is_case_sensitive(),
        ))
    }

    fn build(prefix: String, infix: &[char], anchored: bool, case_sensitive: bool) -> Self {
        Self {
            prefix,
            infix: infix.to_vec(),
            atoms: infix.iter().map(|&c| fold(c, case_sensitive)).collect(),
            anchored,
            case_sensitive,
        }
    }

    /// Same infix, prefix dropped (matching against the whole collection)
    pub fn without_prefix(&self) -> Self {
        Self { prefix: String::new(), ..self.clone() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix.chars().count()
    }

    pub fn infix(&self) -> String {
        self.infix.iter().collect()
    }

    pub fn infix_len(&self) -> usize {
        self.infix.len()
    }

    /// True when the infix is empty: every candidate matches
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Subsequence test, O(len(text)).
    pub fn matches(&self, text: &str) -> bool {
        let mut atoms = self.atoms.iter().peekable();
        for (i, c) in text.chars().enumerate() {
            let Some(&&want) = atoms.peek() else {
                return true;
            };
            if fold(c, self.case_sensitive) == want {
                atoms.next();
            } else if i == 0 && self.anchored {
                return false;
            }
        }
        atoms.peek().is_none()
    }

    /// Leftmost greedy match positions (character indices), or `None` when
    /// the pattern does not match. The empty pattern yields `Some(vec![])`.
    pub fn find_positions(&self, text: &str) -> Option<Vec<usize>> {
        let mut positions = Vec::with_capacity(self.atoms.len());
        if self.atoms.is_empty() {
            return Some(positions);
        }
        for (i, c) in text.chars().enumerate() {
            if fold(c, self.case_sensitive) == self.atoms[positions.len()] {
                positions.push(i);
                if positions.len() == self.atoms.len() {
                    return Some(positions);
                }
            } else if i == 0 && self.anchored {
                return None;
            }
        }
        None
    }

    /// Translate the infix into an equivalent lazy subsequence regex
    /// (`a.*?b.*?c`) for fast enumeration primitives. Case-insensitive
    /// patterns spell out every char that folds onto each atom, so the regex
    /// accepts exactly what `matches` accepts.
    pub fn to_regex(&self) -> Result<Regex, regex::Error> {
        let mut source = String::with_capacity(self.atoms.len() * 8 + 1);
        if self.anchored {
            source.push('^');
        }
        for (i, &atom) in self.atoms.iter().enumerate() {
            if i > 0 {
                source.push_str(".*?");
            }
            let sources = if self.case_sensitive { None } else { FOLD_SOURCES.get(&atom) };
            match sources {
                None => source.push_str(&escape_char(atom)),
                Some(others) => {
                    source.push_str("(?:");
                    source.push_str(&escape_char(atom));
                    for &c in others {
                        source.push('|');
                        source.push_str(&escape_char(c));
                    }
                    source.push(')');
                }
            }
        }
        RegexBuilder::new(&source).dot_matches_new_line(true).build()
    }
}

fn escape_char(c: char) -> String {
    regex::escape(c.encode_utf8(&mut [0u8; 4]))
}
