//! Context memory for conversational assistants
//!
//! Two independent components:
//! - [`context::ContextWindowManager`] tracks token usage against a model's
//!   context window and performs summarize-store-truncate resets
//! - [`knowledge::DocumentStore`] ingests documents as overlapping chunks
//!   persisted one file per chunk

pub mod config;
pub mod context;
pub mod error;
pub mod knowledge;
pub mod metrics;
pub mod observability;

pub use error::{ContextError, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::config::{Config, ContextConfig, KnowledgeBaseConfig, LoggingConfig};
    pub use crate::context::{
        ContextSnapshot, ContextWindowManager, ConversationTurn, HistoryEntry, Role,
        UsageAnalysis, UsageStatus,
    };
    pub use crate::error::{ContextError, Result};
    pub use crate::knowledge::{Chunk, DeletionReport, Document, DocumentStore};
}
