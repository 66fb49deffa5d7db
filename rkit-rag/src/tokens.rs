//! Token counting.
//!
//! Chunk size limits are expressed in tokens, but the real tokenizer lives
//! with the embedding provider. [`TokenCounter`] abstracts the estimate so a
//! provider-specific tokenizer can be substituted without touching the
//! chunker.

/// An estimator for the token length of a text span.
pub trait TokenCounter: Send + Sync {
    /// Estimate the number of tokens in `text`.
    ///
    /// Must return 0 for empty or whitespace-only input and at least 1 for
    /// any input containing a non-whitespace character.
    fn count(&self, text: &str) -> usize;
}

/// A whitespace-word token estimate.
///
/// Counts whitespace-separated words. Crude but monotone in text length,
/// deterministic, and close enough for split decisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenCounter;

impl TokenCounter for WordTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_whitespace_separated_words() {
        let counter = WordTokenCounter;
        assert_eq!(counter.count("Paris is the capital of France."), 6);
        assert_eq!(counter.count("one"), 1);
    }

    #[test]
    fn empty_input_counts_zero() {
        let counter = WordTokenCounter;
        assert_eq!(counter.count(""), 0);
        assert_eq!(counter.count("   \t\n"), 0);
    }
}
