//! In-memory document catalog mirrored to `documents.json`

use super::models::Document;
use crate::error::{ContextError, Result};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Insertion-ordered table of documents with an explicit flush
#[derive(Debug)]
pub struct Catalog {
    path: PathBuf,
    entries: IndexMap<String, Document>,
    dirty: bool,
}

impl Catalog {
    /// Load the catalog file; a missing or corrupt file yields an empty catalog.
    ///
    /// A corrupt file is renamed to `<name>.corrupt` so a later flush cannot
    /// overwrite it.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<IndexMap<String, Document>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Error loading documents from {}: {}", path.display(), e);
                    set_aside(&path);
                    IndexMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => IndexMap::new(),
            Err(e) => {
                warn!("Error reading {}: {}", path.display(), e);
                IndexMap::new()
            }
        };

        debug!("Loaded {} catalog entries from {}", entries.len(), path.display());

        Self {
            path,
            entries,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn insert(&mut self, document: Document) {
        self.entries.insert(document.id.clone(), document);
        self.dirty = true;
    }

    /// Remove an entry, preserving the order of the rest
    pub fn remove(&mut self, id: &str) -> Option<Document> {
        let removed = self.entries.shift_remove(id);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether in-memory changes have not been flushed yet
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the whole catalog through a temp file and rename
    pub fn flush(&mut self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");

        std::fs::write(&tmp, json)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                ContextError::Persistence(format!(
                    "Failed to save catalog {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        self.dirty = false;
        Ok(())
    }
}

fn set_aside(path: &Path) {
    let mut aside = path.as_os_str().to_owned();
    aside.push(".corrupt");
    match std::fs::rename(path, &aside) {
        Ok(()) => warn!("Moved corrupt catalog to {}", Path::new(&aside).display()),
        Err(e) => warn!("Failed to move corrupt catalog {}: {}", path.display(), e),
    }
}
