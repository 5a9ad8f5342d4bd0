//! Context window management with token budget tracking
//!
//! This module estimates how much of a model's context window a conversation
//! consumes, classifies the risk, and performs summarize-store-truncate resets
//! before the budget is exceeded.

pub mod models;
pub mod summarizer;
pub mod token_budget;
pub mod token_estimator;
pub mod window_manager;

pub use models::{
    ContextSnapshot, ConversationTurn, HistoryEntry, Role, UsageAnalysis, UsageStatus,
};
pub use summarizer::{DigestSummarizer, Summarizer};
pub use token_budget::{
    classify_usage, limit_for_model, BudgetEstimator, CRITICAL_THRESHOLD, DEFAULT_MODEL_LIMIT,
    MODERATE_THRESHOLD, WARNING_THRESHOLD,
};
pub use token_estimator::{CharRatioEstimator, TokenEstimator};
pub use window_manager::ContextWindowManager;
