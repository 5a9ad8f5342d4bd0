//! Integration tests for the document store

use context_memory::knowledge::{Chunk, DocumentStore};
use context_memory::prelude::*;
use std::collections::HashMap;

fn paragraph(topic: &str, len: usize) -> String {
    format!("Notes about {}. ", topic)
        .chars()
        .cycle()
        .take(len)
        .collect()
}

#[test]
fn test_document_lifecycle() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut store = DocumentStore::open(KnowledgeBaseConfig::with_base_path(dir.path()))?;

    let mut metadata = HashMap::new();
    metadata.insert("tags".to_string(), serde_json::json!(["rust", "memory"]));
    let doc_id = store.add_document(
        "Ownership",
        &paragraph("ownership", 3000),
        "text",
        None,
        Some(metadata),
    )?;

    let doc = store.get_document(&doc_id).expect("document").clone();
    assert_eq!(doc.chunk_count, store.get_chunks(&doc_id).len());
    assert_eq!(store.list_documents().len(), 1);

    // edit one chunk, drop another
    let first = Chunk::make_id(&doc_id, 0);
    let second = Chunk::make_id(&doc_id, 1);
    assert!(store.update_chunk(&first, "Borrowing rules, revised.")?);
    assert!(store.delete_chunk(&second)?);
    assert_eq!(store.get_chunks(&doc_id).len(), doc.chunk_count - 1);
    assert_eq!(store.search("revised").len(), 1);

    // the catalog still reports the ingested count
    assert_eq!(store.get_document(&doc_id).map(|d| d.chunk_count), Some(doc.chunk_count));

    let report = store.delete_document(&doc_id);
    assert!(report.succeeded());
    assert_eq!(report.chunks_deleted.len(), doc.chunk_count - 1);
    assert!(store.get_document(&doc_id).is_none());
    assert!(store.get_document_content(&doc_id).is_none());
    assert!(store.search("ownership").is_empty());

    Ok(())
}

#[test]
fn test_reopen_preserves_catalog_order() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = KnowledgeBaseConfig::with_base_path(dir.path());

    let ids = {
        let mut store = DocumentStore::open(config.clone())?;
        let mut ids = Vec::new();
        for title in ["Gamma", "Alpha", "Beta"] {
            ids.push(store.add_document(title, &paragraph(title, 800), "text", None, None)?);
        }
        store.flush()?;
        ids
    };

    let store = DocumentStore::open(config)?;
    let listed: Vec<&str> = store.list_documents().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(listed, ids.iter().map(String::as_str).collect::<Vec<_>>());

    let hits = store.search("notes about");
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].title, "Gamma");

    Ok(())
}

#[test]
fn test_corrupt_catalog_starts_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("documents.json"), "not json")?;

    let store = DocumentStore::open(KnowledgeBaseConfig::with_base_path(dir.path()))?;
    assert!(store.list_documents().is_empty());
    assert!(dir.path().join("documents.json.corrupt").exists());
    Ok(())
}

#[test]
fn test_validation_errors_surface() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut store = DocumentStore::open(KnowledgeBaseConfig::with_base_path(dir.path()))?;

    let err = store
        .add_document("", "content", "text", None, None)
        .unwrap_err();
    assert!(matches!(err, ContextError::Validation(ref msg) if msg == "Document title is required"));
    assert!(store.get_chunk("../documents").unwrap_err().is_validation());
    Ok(())
}
