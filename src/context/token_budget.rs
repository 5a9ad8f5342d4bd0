//! Token budget estimation and usage classification
//!
//! Context ceilings are deliberately conservative, well under each model
//! family's advertised maximum, to leave room for prompt scaffolding:
//! - 128K-class families: 120,000 tokens
//! - 32K-class families: 30,000 tokens
//! - Unknown models: 30,000 tokens

use super::models::UsageStatus;
use super::token_estimator::{CharRatioEstimator, TokenEstimator};
use std::sync::Arc;

/// Usage ratio at which status becomes moderate
pub const MODERATE_THRESHOLD: f64 = 0.5;
/// Usage ratio at which status becomes warning
pub const WARNING_THRESHOLD: f64 = 0.75;
/// Usage ratio at which status becomes critical (reset required)
pub const CRITICAL_THRESHOLD: f64 = 0.85;

/// Ceiling used when no family matches
pub const DEFAULT_MODEL_LIMIT: usize = 30_000;

/// Model family → usable context ceiling
pub const MODEL_FAMILY_LIMITS: &[(&str, usize)] = &[
    ("phi3", 120_000),
    ("llama3", 30_000),
    ("llama3.1", 120_000),
    ("llama3.2", 120_000),
    ("mixtral", 30_000),
    ("dolphin", 30_000),
    ("openhermes", 30_000),
    ("hermes", 30_000),
    ("wizard", 30_000),
    ("mistral", 30_000),
    ("qwen", 30_000),
];

/// Lowercase the identifier and drop any `:tag` suffix
pub fn normalize_model_name(model_name: &str) -> String {
    model_name
        .split(':')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Context ceiling for a model identifier.
///
/// The longest family name contained in the normalized identifier wins, so
/// `llama3.1:8b` resolves to the `llama3.1` entry rather than `llama3`.
/// A first-match walk over the table would let `llama3` shadow both
/// `llama3.1` and `llama3.2` and cap them at 30 000.
pub fn limit_for_model(model_name: &str) -> usize {
    let key = normalize_model_name(model_name);

    MODEL_FAMILY_LIMITS
        .iter()
        .filter(|(family, _)| key.contains(family))
        .max_by_key(|(family, _)| family.len())
        .map(|(_, limit)| *limit)
        .unwrap_or(DEFAULT_MODEL_LIMIT)
}

/// Classify a usage ratio, most severe threshold first
pub fn classify_usage(usage_ratio: f64) -> UsageStatus {
    if usage_ratio >= CRITICAL_THRESHOLD {
        UsageStatus::Critical
    } else if usage_ratio >= WARNING_THRESHOLD {
        UsageStatus::Warning
    } else if usage_ratio >= MODERATE_THRESHOLD {
        UsageStatus::Moderate
    } else {
        UsageStatus::Optimal
    }
}

/// Maps text to approximate token counts and models to context ceilings
#[derive(Clone)]
pub struct BudgetEstimator {
    estimator: Arc<dyn TokenEstimator>,
}

impl BudgetEstimator {
    pub fn new(estimator: Arc<dyn TokenEstimator>) -> Self {
        Self { estimator }
    }

    /// Approximate token count; callers must not assume model-exact counts
    pub fn estimate_tokens(&self, text: &str) -> usize {
        self.estimator.estimate(text)
    }

    pub fn limit_for_model(&self, model_name: &str) -> usize {
        limit_for_model(model_name)
    }
}

impl Default for BudgetEstimator {
    fn default() -> Self {
        Self::new(Arc::new(CharRatioEstimator::default()))
    }
}

impl std::fmt::Debug for BudgetEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BudgetEstimator").finish_non_exhaustive()
    }
}
