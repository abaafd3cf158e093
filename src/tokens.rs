//! Approximate token counting
//!
//! No tokenizer is consulted. Counts are derived from the character length of
//! the text with a fixed ratio, so every number produced here is an estimate
//! and must never be treated as an exact bound.

/// Estimated tokens per character of text.
pub const TOKENS_PER_CHAR: f64 = 0.3;

/// Anything that carries message text whose size counts toward a request.
pub trait HasContent {
    fn content(&self) -> &str;
}

/// Character-ratio token estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenEstimator {
    tokens_per_char: f64,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self {
            tokens_per_char: TOKENS_PER_CHAR,
        }
    }
}

impl TokenEstimator {
    /// Create an estimator with the default ratio
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimate tokens for a piece of text.
    ///
    /// Length is measured in Unicode scalar values rather than bytes, so
    /// Cyrillic text is not counted double. The product is rounded half away
    /// from zero.
    pub fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let chars = text.chars().count() as f64;
        (chars * self.tokens_per_char).round() as usize
    }

    /// Sum of [`estimate`](Self::estimate) over the content of every item
    pub fn estimate_total<'a, T, I>(&self, items: I) -> usize
    where
        T: HasContent + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        items
            .into_iter()
            .map(|item| self.estimate(item.content()))
            .sum()
    }
}
