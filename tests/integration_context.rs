//! Integration tests for the context window manager
//!
//! These tests drive a full analyze / reset / retrieve cycle against a
//! scratch storage directory.

use context_memory::prelude::*;
use serde_json::json;

fn manager(dir: &tempfile::TempDir) -> anyhow::Result<ContextWindowManager> {
    Ok(ContextWindowManager::new(ContextConfig::with_storage_dir(
        dir.path(),
    ))?)
}

fn long_conversation(turns: usize) -> Vec<HistoryEntry> {
    (0..turns)
        .map(|i| {
            let content = format!("message {} {}", i, "x".repeat(400));
            if i % 2 == 0 {
                ConversationTurn::user(content).into()
            } else {
                ConversationTurn::assistant(content).into()
            }
        })
        .collect()
}

#[test]
fn test_reset_cycle_when_critical() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let manager = manager(&dir)?;

    // ~100 tokens per turn against the 30k default ceiling
    let history = long_conversation(270);
    let analysis = manager.analyze(&history, "unknown-model");
    assert_eq!(analysis.max_tokens, 30_000);
    assert_eq!(analysis.status, UsageStatus::Critical);
    assert!(analysis.needs_reset());

    let (reduced, summary) = manager.reset(&history, "unknown-model", "conv-42");
    assert_eq!(reduced.len(), 6);
    assert!(summary.contains("Conversation length: 270 messages"));

    let head = reduced[0].as_turn().expect("summary turn");
    assert_eq!(head.role, Role::System);
    assert_eq!(head.content, format!("[Previous conversation summary: {}]", summary));
    assert_eq!(head.metadata["type"], json!("context_summary"));

    let key = head.metadata["context_hash"].as_str().unwrap_or_default();
    assert_eq!(key.len(), 12);
    assert_eq!(manager.retrieve_summary(key).as_deref(), Some(summary.as_str()));

    let snapshot = manager.load_snapshot(key).expect("snapshot");
    assert_eq!(snapshot.conversation_id, "conv-42");
    assert_eq!(snapshot.message_count, 270);
    assert_eq!(snapshot.retained_tail.len(), 50);
    assert_eq!(snapshot.retained_tail.last(), history.last());

    // the reduced history is back under budget
    let after = manager.analyze(&reduced, "unknown-model");
    assert_eq!(after.status, UsageStatus::Optimal);

    Ok(())
}

#[test]
fn test_larger_model_family_has_headroom() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let manager = manager(&dir)?;

    let history = long_conversation(270);
    let analysis = manager.analyze(&history, "Llama3.1-70B-Instruct");
    assert_eq!(analysis.max_tokens, 120_000);
    assert_eq!(analysis.status, UsageStatus::Optimal);
    assert!(!analysis.needs_reset());
    assert!(manager.status_display(&analysis).contains("tokens remaining"));

    Ok(())
}

#[test]
fn test_snapshot_file_layout() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let manager = manager(&dir)?;

    let history: Vec<HistoryEntry> = vec!["plain text entry".into()];
    let key = manager.persist("conv-1", "short summary", &history);

    let path = dir.path().join(format!("context_{}.json", key));
    let stored: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    assert_eq!(stored["summary"], "short summary");
    assert_eq!(stored["message_count"], 1);
    assert_eq!(stored["full_context"], json!(["plain text entry"]));

    Ok(())
}

#[test]
fn test_unknown_key_is_absent() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let manager = manager(&dir)?;

    assert!(manager.retrieve_summary("nonexistent").is_none());
    assert!(manager.retrieve_summary("../../etc/passwd").is_none());
    Ok(())
}

#[test]
fn test_purge_keeps_fresh_snapshots() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let manager = manager(&dir)?;

    let history: Vec<HistoryEntry> = vec!["entry".into()];
    let key = manager.persist("conv-1", "summary", &history);
    assert_eq!(manager.purge_expired(), 0);
    assert!(manager.retrieve_summary(&key).is_some());
    Ok(())
}
