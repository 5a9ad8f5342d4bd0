//! Approximate token estimation

/// Token estimator trait for different approximation strategies
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of tokens in the given text
    fn estimate(&self, text: &str) -> usize;
}

/// Characters-per-token estimator (default: 1 token ≈ 4 characters).
///
/// Counts Unicode scalar values, not bytes, and rounds down.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    chars_per_token: usize,
}

impl CharRatioEstimator {
    pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHARS_PER_TOKEN)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count() / self.chars_per_token
    }
}
