//! Data models for the document store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Catalog entry for an ingested document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub source_type: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_date: DateTime<Utc>,
    /// Number of chunks written at ingestion
    pub chunk_count: usize,
}

/// A bounded span of a document, stored in its own file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub text: String,
    /// Character offset into the ingested content
    pub char_start: usize,
    /// Exclusive character offset into the ingested content
    pub char_end: usize,
    pub created_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<DateTime<Utc>>,
}

impl Chunk {
    /// Chunk id for a document and index: `<document_id>_<index>`
    pub fn make_id(document_id: &str, chunk_index: usize) -> String {
        format!("{}_{}", document_id, chunk_index)
    }
}

/// Outcome of a best-effort cascading document delete.
///
/// Each step runs even if an earlier one failed, so callers can see exactly
/// what is left behind and reconcile it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub document_id: String,
    /// Whether the catalog knew the document
    pub found: bool,
    pub chunks_deleted: Vec<String>,
    pub chunks_failed: Vec<String>,
    pub content_removed: bool,
    /// Entry removed and catalog flushed
    pub catalog_removed: bool,
    pub errors: Vec<String>,
}

impl DeletionReport {
    pub fn not_found(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            ..Self::default()
        }
    }

    /// True when the document existed and every step succeeded
    pub fn succeeded(&self) -> bool {
        self.found
            && self.chunks_failed.is_empty()
            && self.content_removed
            && self.catalog_removed
            && self.errors.is_empty()
    }
}
