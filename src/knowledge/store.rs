//! File-backed document store
//!
//! Layout under the knowledge base root:
//! - `documents.json`: catalog of every document
//! - `documents/<id>_content.txt`: full ingested text
//! - `chunks/<id>_<index>.json`: one file per chunk
//!
//! Chunks are split once at ingestion and are independently editable
//! afterwards. Edits do not touch the stored full text or the recorded
//! character offsets.

use super::catalog::Catalog;
use super::models::{Chunk, DeletionReport, Document};
use super::splitter::ChunkSplitter;
use crate::config::KnowledgeBaseConfig;
use crate::error::{ContextError, Result};
use crate::metrics::METRICS;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CATALOG_FILE: &str = "documents.json";
const DOCUMENTS_DIR: &str = "documents";
const CHUNKS_DIR: &str = "chunks";

/// Document store with file-per-chunk persistence.
///
/// Mutating operations on the catalog take `&mut self`; a store shared
/// between threads must be wrapped in a lock by the owner.
#[derive(Debug)]
pub struct DocumentStore {
    config: KnowledgeBaseConfig,
    documents_dir: PathBuf,
    chunks_dir: PathBuf,
    catalog: Catalog,
    splitter: ChunkSplitter,
}

impl DocumentStore {
    /// Open (or create) a knowledge base
    pub fn open(config: KnowledgeBaseConfig) -> Result<Self> {
        config.validate()?;
        let splitter = ChunkSplitter::from_config(&config)?;

        let documents_dir = config.base_path.join(DOCUMENTS_DIR);
        let chunks_dir = config.base_path.join(CHUNKS_DIR);
        std::fs::create_dir_all(&documents_dir)?;
        std::fs::create_dir_all(&chunks_dir)?;

        let catalog = Catalog::load(config.base_path.join(CATALOG_FILE));
        info!(
            "Document store opened at {} with {} documents",
            config.base_path.display(),
            catalog.len()
        );

        Ok(Self {
            config,
            documents_dir,
            chunks_dir,
            catalog,
            splitter,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    pub fn splitter(&self) -> &ChunkSplitter {
        &self.splitter
    }

    /// Ingest a document: store its text, split it, write each chunk and
    /// record it in the catalog.
    pub fn add_document(
        &mut self,
        title: &str,
        content: &str,
        source_type: &str,
        source_url: Option<&str>,
        metadata: Option<HashMap<String, serde_json::Value>>,
    ) -> Result<String> {
        self.validate_document(title, content)?;

        let title = title.trim();
        let content = content.trim();
        let doc_id = uuid::Uuid::new_v4().to_string();

        write_file(&self.content_path(&doc_id), content)?;

        let spans = self.splitter.split(content);
        let created_date = Utc::now();
        for span in &spans {
            let chunk = Chunk {
                id: Chunk::make_id(&doc_id, span.index),
                document_id: doc_id.clone(),
                chunk_index: span.index,
                text: span.text.clone(),
                char_start: span.start,
                char_end: span.end,
                created_date,
                modified_date: None,
            };
            write_json(&self.chunk_path(&chunk.id), &chunk)?;
        }

        self.catalog.insert(Document {
            id: doc_id.clone(),
            title: title.to_string(),
            source_type: source_type.to_string(),
            source_url: source_url.map(str::to_string),
            metadata: metadata.unwrap_or_default(),
            created_date,
            chunk_count: spans.len(),
        });
        self.catalog.flush()?;

        info!("Added document '{}' with {} chunks", title, spans.len());
        METRICS.record_document_added(spans.len());

        Ok(doc_id)
    }

    fn validate_document(&self, title: &str, content: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Err(ContextError::Validation("Document title is required".to_string()));
        }
        if content.trim().is_empty() {
            return Err(ContextError::Validation(
                "Document content is required".to_string(),
            ));
        }
        if title.chars().count() > self.config.max_title_chars {
            return Err(ContextError::Validation(format!(
                "Document title too long (max {} characters)",
                self.config.max_title_chars
            )));
        }
        if content.len() > self.config.max_content_bytes {
            return Err(ContextError::Validation(format!(
                "Document content too large (max {} bytes)",
                self.config.max_content_bytes
            )));
        }
        Ok(())
    }

    pub fn get_document(&self, doc_id: &str) -> Option<&Document> {
        self.catalog.get(doc_id)
    }

    /// All documents in ingestion order
    pub fn list_documents(&self) -> Vec<&Document> {
        self.catalog.documents().collect()
    }

    /// Full text stored at ingestion
    pub fn get_document_content(&self, doc_id: &str) -> Option<String> {
        if !self.catalog.contains(doc_id) {
            return None;
        }
        match std::fs::read_to_string(self.content_path(doc_id)) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!("Failed to read content for document {}: {}", doc_id, e);
                None
            }
        }
    }

    /// Chunk files addressed by a document id, parsed or not
    fn chunk_files(&self, doc_id: &str) -> Vec<PathBuf> {
        if !is_valid_id(doc_id) {
            debug!("Rejected document id {:?}", doc_id);
            return Vec::new();
        }

        let pattern = format!(
            "{}/{}_*.json",
            glob::Pattern::escape(&self.chunks_dir.to_string_lossy()),
            glob::Pattern::escape(doc_id)
        );
        let entries = match glob::glob(&pattern) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Invalid chunk pattern {}: {}", pattern, e);
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Error listing chunk: {}", e);
                    None
                }
            })
            .filter(|path| is_chunk_file_of(path, doc_id))
            .collect()
    }

    /// Chunks of a document ordered by `chunk_index`.
    ///
    /// Corrupt chunk files are skipped with a warning.
    pub fn get_chunks(&self, doc_id: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for path in self.chunk_files(doc_id) {
            match read_chunk(&path) {
                Ok(chunk) if chunk.document_id == doc_id => chunks.push(chunk),
                Ok(chunk) => {
                    debug!(
                        "Skipping chunk {} owned by document {}",
                        chunk.id, chunk.document_id
                    );
                }
                Err(e) => {
                    warn!("Error loading chunk {}: {}", path.display(), e);
                    METRICS.record_corrupt_record();
                }
            }
        }

        chunks.sort_by_key(|chunk| chunk.chunk_index);
        chunks
    }

    /// A single chunk; absent when missing or unreadable
    pub fn get_chunk(&self, chunk_id: &str) -> Result<Option<Chunk>> {
        validate_chunk_id(chunk_id)?;
        let path = self.chunk_path(chunk_id);
        if !path.exists() {
            return Ok(None);
        }
        match read_chunk(&path) {
            Ok(chunk) => Ok(Some(chunk)),
            Err(e) => {
                warn!("Error loading chunk {}: {}", chunk_id, e);
                Ok(None)
            }
        }
    }

    /// Replace a chunk's text; `Ok(false)` when the chunk does not exist or
    /// could not be rewritten.
    pub fn update_chunk(&self, chunk_id: &str, new_text: &str) -> Result<bool> {
        validate_chunk_id(chunk_id)?;
        let path = self.chunk_path(chunk_id);
        if !path.exists() {
            return Ok(false);
        }

        let mut chunk = match read_chunk(&path) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Error updating chunk {}: {}", chunk_id, e);
                return Ok(false);
            }
        };
        chunk.text = new_text.to_string();
        chunk.modified_date = Some(Utc::now());

        match write_json(&path, &chunk) {
            Ok(()) => {
                info!("Updated chunk {}", chunk_id);
                Ok(true)
            }
            Err(e) => {
                warn!("Error updating chunk {}: {}", chunk_id, e);
                Ok(false)
            }
        }
    }

    /// Delete one chunk without touching its document
    pub fn delete_chunk(&self, chunk_id: &str) -> Result<bool> {
        validate_chunk_id(chunk_id)?;
        let path = self.chunk_path(chunk_id);
        if !path.exists() {
            return Ok(false);
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted chunk {}", chunk_id);
                Ok(true)
            }
            Err(e) => {
                warn!("Error deleting chunk {}: {}", chunk_id, e);
                Ok(false)
            }
        }
    }

    /// Delete a document with all of its chunks, its content file and its
    /// catalog entry. Every step is attempted regardless of earlier failures.
    pub fn delete_document(&mut self, doc_id: &str) -> DeletionReport {
        if !self.catalog.contains(doc_id) {
            return DeletionReport::not_found(doc_id);
        }

        let mut report = DeletionReport {
            document_id: doc_id.to_string(),
            found: true,
            ..DeletionReport::default()
        };

        // Matched by file name so unparseable chunk files go too
        for path in self.chunk_files(doc_id) {
            let chunk_id = chunk_id_of(&path);
            match std::fs::remove_file(&path) {
                Ok(()) => report.chunks_deleted.push(chunk_id),
                Err(e) => {
                    warn!("Error deleting chunk {}: {}", chunk_id, e);
                    report.errors.push(format!("chunk {}: {}", chunk_id, e));
                    report.chunks_failed.push(chunk_id);
                }
            }
        }

        match std::fs::remove_file(self.content_path(doc_id)) {
            Ok(()) => report.content_removed = true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => report.content_removed = true,
            Err(e) => {
                warn!("Error deleting content of document {}: {}", doc_id, e);
                report.errors.push(format!("content: {}", e));
            }
        }

        self.catalog.remove(doc_id);
        match self.catalog.flush() {
            Ok(()) => report.catalog_removed = true,
            Err(e) => {
                warn!("Error saving catalog after deleting {}: {}", doc_id, e);
                report.errors.push(format!("catalog: {}", e));
            }
        }

        if report.succeeded() {
            info!("Deleted document {}", doc_id);
        } else {
            warn!(
                "Partially deleted document {}: {} errors",
                doc_id,
                report.errors.len()
            );
        }
        METRICS.record_document_deleted(report.succeeded());

        report
    }

    /// Case-insensitive substring search over titles, then chunk texts.
    /// Returns each matching document once, in catalog order.
    pub fn search(&self, query: &str) -> Vec<&Document> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let query = query.to_lowercase();

        let results: Vec<&Document> = self
            .catalog
            .documents()
            .filter(|doc| {
                doc.title.to_lowercase().contains(&query)
                    || self
                        .get_chunks(&doc.id)
                        .iter()
                        .any(|chunk| chunk.text.to_lowercase().contains(&query))
            })
            .collect();

        debug!("Search for {:?} matched {} documents", query, results.len());
        METRICS.record_search(results.len());

        results
    }

    /// Write pending catalog changes
    pub fn flush(&mut self) -> Result<()> {
        if self.catalog.is_dirty() {
            self.catalog.flush()?;
        }
        Ok(())
    }

    fn content_path(&self, doc_id: &str) -> PathBuf {
        self.documents_dir.join(format!("{}_content.txt", doc_id))
    }

    fn chunk_path(&self, chunk_id: &str) -> PathBuf {
        self.chunks_dir.join(format!("{}.json", chunk_id))
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn chunk_id_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<doc_id>_<digits>.json`
fn is_chunk_file_of(path: &Path, doc_id: &str) -> bool {
    chunk_id_of(path)
        .strip_prefix(doc_id)
        .and_then(|rest| rest.strip_prefix('_'))
        .map_or(false, |index| {
            !index.is_empty() && index.chars().all(|c| c.is_ascii_digit())
        })
}

fn validate_chunk_id(chunk_id: &str) -> Result<()> {
    if is_valid_id(chunk_id) {
        Ok(())
    } else {
        Err(ContextError::Validation(format!("Invalid chunk id: {:?}", chunk_id)))
    }
}

fn read_chunk(path: &Path) -> Result<Chunk> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| ContextError::CorruptRecord {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| {
        ContextError::Persistence(format!("Failed to write {}: {}", path.display(), e))
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_file(path, &json)
}
