//! Conversation summarization for context resets
//!
//! The default [`DigestSummarizer`] is cheap, synchronous and never fails:
//! it extracts topics, recent user queries and flagged assistant notes into
//! a single `" | "`-separated line. It is lossy by design; the full tail of
//! the conversation is kept in the persisted snapshot.

use super::models::{HistoryEntry, Role};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Summary returned for an empty history
pub const EMPTY_SUMMARY: &str = "Empty conversation";

/// Assistant turns containing any of these are carried into the summary
pub const IMPORTANCE_KEYWORDS: &[&str] = &["important", "note", "remember", "key"];

const MAX_TOPICS: usize = 10;
const MIN_TOPIC_CHARS: usize = 5;
const RECENT_QUERY_COUNT: usize = 3;
const IMPORTANT_EXCERPT_CHARS: usize = 200;

/// Summarizer trait for different summarization strategies
pub trait Summarizer: Send + Sync {
    /// Summarize a history into a single line of text
    fn summarize(&self, history: &[HistoryEntry]) -> String;
}

/// Deterministic structured digest of a conversation
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestSummarizer;

impl DigestSummarizer {
    /// Build the digest with an explicit generation time
    pub fn digest(&self, history: &[HistoryEntry], generated_at: DateTime<Utc>) -> String {
        if history.is_empty() {
            return EMPTY_SUMMARY.to_string();
        }

        let mut topics = BTreeSet::new();
        let mut user_queries: Vec<&str> = Vec::new();
        let mut important_info = Vec::new();

        for turn in history.iter().filter_map(HistoryEntry::as_turn) {
            match turn.role {
                Role::User => {
                    user_queries.push(&turn.content);
                    for word in turn.content.to_lowercase().split_whitespace() {
                        if is_topic_word(word) {
                            topics.insert(word.to_string());
                        }
                    }
                }
                Role::Assistant => {
                    let lowered = turn.content.to_lowercase();
                    if IMPORTANCE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
                        important_info.push(excerpt(&turn.content, IMPORTANT_EXCERPT_CHARS));
                    }
                }
                Role::System => {}
            }
        }

        let mut parts = Vec::new();

        if !topics.is_empty() {
            let shown: Vec<&str> = topics.iter().take(MAX_TOPICS).map(String::as_str).collect();
            parts.push(format!("Topics discussed: {}", shown.join(", ")));
        }

        if !user_queries.is_empty() {
            let start = user_queries.len().saturating_sub(RECENT_QUERY_COUNT);
            parts.push(format!(
                "Recent user queries: {}",
                user_queries[start..].join("; ")
            ));
        }

        if !important_info.is_empty() {
            parts.push(format!("Important information: {}", important_info.join("; ")));
        }

        parts.push(format!("Conversation length: {} messages", history.len()));
        parts.push(format!(
            "Summary created: {}",
            generated_at.format("%Y-%m-%d %H:%M:%S")
        ));

        parts.join(" | ")
    }
}

impl Summarizer for DigestSummarizer {
    fn summarize(&self, history: &[HistoryEntry]) -> String {
        self.digest(history, Utc::now())
    }
}

fn is_topic_word(word: &str) -> bool {
    word.chars().count() >= MIN_TOPIC_CHARS && word.chars().all(char::is_alphabetic)
}

fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
