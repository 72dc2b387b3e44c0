//! Completion candidate with memoized derived state.
//!
//! Module isolation ensures no code outside this module can mutate `text`
//! after construction, so the `OnceLock` cache can never go stale.

use std::sync::OnceLock;

/// A candidate string plus opaque host data that survives the pipeline.
/// `char_len()` is computed on first access and cached; scaling, scoring,
/// ranking and highlighting all read it.
#[derive(Debug, Clone)]
pub struct Candidate<T = ()> {
    text: String,
    data: T,
    char_len: OnceLock<usize>,
}

impl Candidate<()> {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_data(text, ())
    }
}

impl<T> Candidate<T> {
    pub fn with_data(text: impl Into<String>, data: T) -> Self {
        Self {
            text: text.into(),
            data,
            char_len: OnceLock::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_parts(self) -> (String, T) {
        (self.text, self.data)
    }

    /// Length in characters (the unit every position and span uses)
    pub fn char_len(&self) -> usize {
        *self.char_len.get_or_init(|| self.text.chars().count())
    }
}

impl From<&str> for Candidate<()> {
    fn from(text: &str) -> Self {
        Candidate::new(text)
    }
}

impl From<String> for Candidate<()> {
    fn from(text: String) -> Self {
        Candidate::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memoized_len() {
        let c = Candidate::new("ÉtéFile.rs");
        assert_eq!(c.char_len(), 10);
        // Second access hits the cache and agrees
        assert_eq!(c.char_len(), 10);
    }

    #[test]
    fn test_side_data_survives() {
        let c = Candidate::with_data("main.rs", 42u32);
        assert_eq!(*c.data(), 42);
        let (text, data) = c.into_parts();
        assert_eq!(text, "main.rs");
        assert_eq!(data, 42);
    }
}
