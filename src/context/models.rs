//! Data models for context window management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A structured conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    /// Turn text; non-string payloads are stringified on deserialization
    #[serde(default, deserialize_with = "content_as_text")]
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

fn content_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// One entry of a conversation history.
///
/// Histories arriving from clients mix structured turns and bare strings.
/// The variant is decided once, when the entry is built or deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryEntry {
    Turn(ConversationTurn),
    Raw(String),
}

impl HistoryEntry {
    /// Text counted against the token budget
    pub fn text(&self) -> &str {
        match self {
            HistoryEntry::Turn(turn) => &turn.content,
            HistoryEntry::Raw(text) => text,
        }
    }

    /// Role of a structured turn; raw entries have none
    pub fn role(&self) -> Option<Role> {
        match self {
            HistoryEntry::Turn(turn) => Some(turn.role),
            HistoryEntry::Raw(_) => None,
        }
    }

    pub fn as_turn(&self) -> Option<&ConversationTurn> {
        match self {
            HistoryEntry::Turn(turn) => Some(turn),
            HistoryEntry::Raw(_) => None,
        }
    }
}

impl From<ConversationTurn> for HistoryEntry {
    fn from(turn: ConversationTurn) -> Self {
        HistoryEntry::Turn(turn)
    }
}

impl From<String> for HistoryEntry {
    fn from(text: String) -> Self {
        HistoryEntry::Raw(text)
    }
}

impl From<&str> for HistoryEntry {
    fn from(text: &str) -> Self {
        HistoryEntry::Raw(text.to_string())
    }
}

/// Context usage severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageStatus {
    Optimal,
    Moderate,
    Warning,
    Critical,
}

impl UsageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageStatus::Optimal => "optimal",
            UsageStatus::Moderate => "moderate",
            UsageStatus::Warning => "warning",
            UsageStatus::Critical => "critical",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            UsageStatus::Optimal => "🟢",
            UsageStatus::Moderate => "🟡",
            UsageStatus::Warning => "🟠",
            UsageStatus::Critical => "🔴",
        }
    }

    /// Fixed advice attached to an analysis at this level
    pub fn recommendations(&self) -> Vec<String> {
        let advice: &[&str] = match self {
            UsageStatus::Critical => &[
                "Immediate context reset required",
                "Creating conversation summary",
            ],
            UsageStatus::Warning => &[
                "Consider summarizing older messages",
                "Context approaching limit",
            ],
            UsageStatus::Moderate => &["Context usage is moderate"],
            UsageStatus::Optimal => &[],
        };
        advice.iter().map(|s| s.to_string()).collect()
    }
}

/// Result of analyzing a history against a model's context ceiling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageAnalysis {
    pub current_tokens: usize,
    pub max_tokens: usize,
    pub usage_ratio: f64,
    /// `usage_ratio * 100`, rounded to one decimal
    pub usage_percentage: f64,
    pub status: UsageStatus,
    pub recommendations: Vec<String>,
    /// Negative once the history is over budget
    pub tokens_remaining: i64,
    /// Negative once the history is over budget
    pub estimated_messages_remaining: i64,
}

impl UsageAnalysis {
    pub fn needs_reset(&self) -> bool {
        self.status == UsageStatus::Critical
    }
}

/// Persisted record of a reset: lossy summary plus a verbatim tail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub conversation_id: String,
    pub stored_at: DateTime<Utc>,
    pub summary: String,
    pub message_count: usize,
    pub estimated_tokens: usize,
    #[serde(rename = "full_context")]
    pub retained_tail: Vec<HistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_history_entry_variants_resolved_once() {
        let history: Vec<HistoryEntry> = serde_json::from_value(json!([
            {"role": "user", "content": "hello there"},
            "a bare string",
            {"role": "assistant", "content": {"answer": 42}},
        ]))
        .unwrap();

        assert_eq!(history[0].role(), Some(Role::User));
        assert_eq!(history[0].text(), "hello there");
        assert_eq!(history[1], HistoryEntry::Raw("a bare string".to_string()));
        assert_eq!(history[1].role(), None);
        assert_eq!(history[2].text(), r#"{"answer":42}"#);
    }

    #[test]
    fn test_missing_content_is_empty() {
        let entry: HistoryEntry = serde_json::from_value(json!({"role": "system"})).unwrap();
        assert_eq!(entry.text(), "");
    }

    #[test]
    fn test_status_ordering() {
        assert!(UsageStatus::Optimal < UsageStatus::Moderate);
        assert!(UsageStatus::Moderate < UsageStatus::Warning);
        assert!(UsageStatus::Warning < UsageStatus::Critical);
    }

    #[test]
    fn test_recommendations() {
        assert!(UsageStatus::Optimal.recommendations().is_empty());
        assert_eq!(UsageStatus::Moderate.recommendations().len(), 1);
        assert_eq!(
            UsageStatus::Critical.recommendations()[0],
            "Immediate context reset required"
        );
    }

    #[test]
    fn test_turn_metadata_round_trip() {
        let turn = ConversationTurn::system("summary")
            .with_metadata("type", json!("context_summary"));
        let value = serde_json::to_value(HistoryEntry::from(turn.clone())).unwrap();
        assert_eq!(value["role"], "system");
        assert_eq!(value["metadata"]["type"], "context_summary");

        let back: HistoryEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, HistoryEntry::Turn(turn));
    }
}
