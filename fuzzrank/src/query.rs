//! User query as typed, with the anchor symbol and case policy resolved.

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    raw: String,
    /// Characters after the anchor symbol
    chars: Vec<char>,
    anchored: bool,
    case_sensitive: bool,
}

impl Query {
    pub fn new(raw: &str, config: &Config) -> Self {
        let (anchored, body) = match raw.strip_prefix(config.anchor) {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        Self {
            raw: raw.to_string(),
            chars: body.chars().collect(),
            anchored,
            case_sensitive: config.case_sensitive,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Effective characters, anchor excluded
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Effective length in characters
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }
}
