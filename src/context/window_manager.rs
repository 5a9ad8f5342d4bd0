//! Context window manager with summarize-store-reset lifecycle
//!
//! Implements conversation-level context management with:
//! - Approximate token usage analysis against per-model ceilings
//! - Threshold-based status classification
//! - Lossy summary plus hash-addressed snapshot persistence
//! - Truncating resets that keep a short verbatim tail
//!
//! The manager holds no per-conversation state. Callers own the history and
//! decide when to reset; the manager only reports and performs the reset.

use super::models::{ContextSnapshot, ConversationTurn, HistoryEntry, UsageAnalysis};
use super::summarizer::{DigestSummarizer, Summarizer};
use super::token_budget::{classify_usage, BudgetEstimator};
use crate::config::{Config, ContextConfig};
use crate::error::Result;
use crate::metrics::METRICS;
use chrono::Utc;
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// Length of the hex key addressing a snapshot
pub const SNAPSHOT_KEY_LEN: usize = 12;

const SNAPSHOT_PREFIX: &str = "context_";
const SNAPSHOT_SUFFIX: &str = ".json";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

static SHARED: OnceCell<Arc<ContextWindowManager>> = OnceCell::new();

/// Context window manager
pub struct ContextWindowManager {
    config: ContextConfig,
    budget: BudgetEstimator,
    summarizer: Arc<dyn Summarizer>,
}

impl ContextWindowManager {
    /// Create a manager with the default estimator and digest summarizer
    pub fn new(config: ContextConfig) -> Result<Self> {
        Self::with_components(
            config,
            BudgetEstimator::default(),
            Arc::new(DigestSummarizer),
        )
    }

    /// Create a manager with a custom estimator and summarizer
    pub fn with_components(
        config: ContextConfig,
        budget: BudgetEstimator,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.storage_dir)?;

        info!(
            "Context window manager initialized at {}",
            config.storage_dir.display()
        );

        Ok(Self {
            config,
            budget,
            summarizer,
        })
    }

    /// Process-wide instance, built from [`Config::load`] on first use
    pub fn shared() -> Result<Arc<Self>> {
        SHARED
            .get_or_try_init(|| {
                let config = Config::load()?;
                Self::new(config.context).map(Arc::new)
            })
            .cloned()
    }

    /// Directory holding persisted snapshots
    pub fn storage_dir(&self) -> &Path {
        &self.config.storage_dir
    }

    /// Get the budget estimator
    pub fn budget(&self) -> &BudgetEstimator {
        &self.budget
    }

    /// Analyze current usage of a history against a model's ceiling
    pub fn analyze(&self, history: &[HistoryEntry], model_name: &str) -> UsageAnalysis {
        let current_tokens = self.budget.estimate_tokens(&history_text(history));
        let max_tokens = self.budget.limit_for_model(model_name);
        let usage_ratio = current_tokens as f64 / max_tokens as f64;
        let status = classify_usage(usage_ratio);

        let tokens_remaining = max_tokens as i64 - current_tokens as i64;
        let estimated_messages_remaining =
            tokens_remaining.div_euclid(self.config.avg_message_tokens);

        debug!(
            "Context usage for {}: {}/{} tokens ({:.3}), status={}",
            model_name,
            current_tokens,
            max_tokens,
            usage_ratio,
            status.as_str()
        );
        METRICS.record_analysis(status.as_str(), usage_ratio);

        UsageAnalysis {
            current_tokens,
            max_tokens,
            usage_ratio,
            usage_percentage: (usage_ratio * 1000.0).round() / 10.0,
            status,
            recommendations: status.recommendations(),
            tokens_remaining,
            estimated_messages_remaining,
        }
    }

    /// Summarize a history with the configured summarizer
    pub fn summarize(&self, history: &[HistoryEntry]) -> String {
        self.summarizer.summarize(history)
    }

    /// Persist a snapshot and return its key.
    ///
    /// Returns an empty key when the snapshot could not be written; the
    /// failure is logged and never propagated.
    pub fn persist(
        &self,
        conversation_id: &str,
        summary: &str,
        history: &[HistoryEntry],
    ) -> String {
        let stored_at = Utc::now();
        let key = snapshot_key(conversation_id, &stored_at.to_rfc3339());

        let tail_start = history.len().saturating_sub(self.config.retained_tail);
        let snapshot = ContextSnapshot {
            conversation_id: conversation_id.to_string(),
            stored_at,
            summary: summary.to_string(),
            message_count: history.len(),
            estimated_tokens: self.budget.estimate_tokens(&history_text(history)),
            retained_tail: history[tail_start..].to_vec(),
        };

        match self.write_snapshot(&key, &snapshot) {
            Ok(path) => {
                info!("Stored conversation context: {}", path.display());
                METRICS.record_snapshot(true);
                key
            }
            Err(e) => {
                error!("Failed to store conversation context: {}", e);
                METRICS.record_snapshot(false);
                String::new()
            }
        }
    }

    fn write_snapshot(&self, key: &str, snapshot: &ContextSnapshot) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.config.storage_dir)?;
        let path = self.snapshot_path(key);
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Summary of a persisted snapshot, if the key is known and readable
    pub fn retrieve_summary(&self, key: &str) -> Option<String> {
        self.load_snapshot(key).map(|snapshot| snapshot.summary)
    }

    /// Full persisted snapshot, if the key is known and readable
    pub fn load_snapshot(&self, key: &str) -> Option<ContextSnapshot> {
        if !is_valid_key(key) {
            debug!("Rejected snapshot key {:?}", key);
            return None;
        }

        let path = self.snapshot_path(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot stored under key {}", key);
                return None;
            }
            Err(e) => {
                warn!("Failed to read snapshot {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Corrupt snapshot {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Summarize, persist and truncate a history.
    ///
    /// Returns the reduced history (one system summary turn followed by the
    /// most recent entries) and the summary text. An empty history yields
    /// `(vec![], "")` without touching storage.
    pub fn reset(
        &self,
        history: &[HistoryEntry],
        model_name: &str,
        conversation_id: &str,
    ) -> (Vec<HistoryEntry>, String) {
        if history.is_empty() {
            return (Vec::new(), String::new());
        }

        let summary = self.summarize(history);
        let key = self.persist(conversation_id, &summary, history);

        let summary_turn = ConversationTurn::system(format!(
            "[Previous conversation summary: {}]",
            summary
        ))
        .with_metadata("type", serde_json::json!("context_summary"))
        .with_metadata("context_hash", serde_json::json!(key));

        let tail_start = history.len().saturating_sub(self.config.recent_turns_kept);
        let mut new_history = Vec::with_capacity(history.len() - tail_start + 1);
        new_history.push(HistoryEntry::Turn(summary_turn));
        new_history.extend_from_slice(&history[tail_start..]);

        info!(
            "Context reset for {} ({}) - reduced from {} to {} messages",
            conversation_id,
            model_name,
            history.len(),
            new_history.len()
        );
        METRICS.record_reset();

        (new_history, summary)
    }

    /// One-line status suitable for a chat UI
    pub fn status_display(&self, analysis: &UsageAnalysis) -> String {
        format!(
            "{} Context: {:.1}% used ({} tokens remaining)",
            analysis.status.icon(),
            analysis.usage_percentage,
            format_thousands(analysis.tokens_remaining)
        )
    }

    /// Delete snapshots last modified more than `days` days ago.
    ///
    /// Best-effort: individual failures are logged and skipped. Returns the
    /// number of files actually removed.
    pub fn purge_older_than(&self, days: u64) -> usize {
        let age = Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY));
        let cutoff = match SystemTime::now().checked_sub(age) {
            Some(cutoff) => cutoff,
            None => return 0,
        };

        let pattern = format!(
            "{}/{}*{}",
            glob::Pattern::escape(&self.config.storage_dir.to_string_lossy()),
            SNAPSHOT_PREFIX,
            SNAPSHOT_SUFFIX
        );
        let entries = match glob::glob(&pattern) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error during context cleanup: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping unreadable snapshot entry: {}", e);
                    continue;
                }
            };

            let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            if modified < cutoff {
                match std::fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
                }
            }
        }

        if removed > 0 {
            info!("Cleaned up {} old context files", removed);
        }
        METRICS.record_purge(removed);

        removed
    }

    /// Purge using the configured retention period
    pub fn purge_expired(&self) -> usize {
        self.purge_older_than(self.config.purge_after_days)
    }

    fn snapshot_path(&self, key: &str) -> PathBuf {
        self.config
            .storage_dir
            .join(format!("{}{}{}", SNAPSHOT_PREFIX, key, SNAPSHOT_SUFFIX))
    }
}

/// Concatenated text of every entry, each followed by a space
fn history_text(history: &[HistoryEntry]) -> String {
    let mut text = String::new();
    for entry in history {
        text.push_str(entry.text());
        text.push(' ');
    }
    text
}

/// Content+time derived snapshot key
pub fn snapshot_key(conversation_id: &str, timestamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(conversation_id.as_bytes());
    hasher.update(b"_");
    hasher.update(timestamp.as_bytes());

    let mut key = hex::encode(hasher.finalize());
    key.truncate(SNAPSHOT_KEY_LEN);
    key
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
