//! Knowledge base document store
//!
//! Ingests text documents, splits them into overlapping chunks stored one
//! file each, and supports:
//! - Per-chunk editing and deletion
//! - Cascading document deletion with a step-by-step report
//! - Case-insensitive substring search over titles and chunk text

pub mod catalog;
pub mod models;
pub mod splitter;
pub mod store;

pub use catalog::Catalog;
pub use models::{Chunk, DeletionReport, Document};
pub use splitter::{ChunkSpan, ChunkSplitter};
pub use store::DocumentStore;
