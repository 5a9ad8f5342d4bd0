//! Configuration for context memory
//!
//! Settings are layered: serde defaults, then an optional TOML file, then
//! environment variables prefixed with `CONTEXT_MEMORY__`, e.g.
//! `CONTEXT_MEMORY__KNOWLEDGE_BASE__CHUNK_SIZE=800`.

use crate::error::{ContextError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CONTEXT_MEMORY";

/// Upper bound on entries a reset carries over, keeping a reset history at
/// no more than six entries
pub const MAX_RECENT_TURNS_KEPT: usize = 5;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from `config.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load from the given file (optional) with environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = path.as_ref().to_string_lossy().to_string();
        let config: Config = ::config::Config::builder()
            .add_source(::config::File::with_name(&path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate that the configuration is consistent
    pub fn validate(&self) -> Result<()> {
        self.context.validate()?;
        self.knowledge_base.validate()
    }
}

/// Context window manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Directory holding `context_<key>.json` snapshots
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Most recent entries kept verbatim in a persisted snapshot
    #[serde(default = "default_retained_tail")]
    pub retained_tail: usize,

    /// Most recent entries carried over by a reset
    #[serde(default = "default_recent_turns_kept")]
    pub recent_turns_kept: usize,

    /// Assumed average message size used for the messages-remaining estimate
    #[serde(default = "default_avg_message_tokens")]
    pub avg_message_tokens: i64,

    /// Age after which snapshots are purged
    #[serde(default = "default_purge_after_days")]
    pub purge_after_days: u64,
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("rag_data/context_storage")
}
fn default_retained_tail() -> usize {
    50
}
fn default_recent_turns_kept() -> usize {
    5
}
fn default_avg_message_tokens() -> i64 {
    200
}
fn default_purge_after_days() -> u64 {
    30
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            retained_tail: default_retained_tail(),
            recent_turns_kept: default_recent_turns_kept(),
            avg_message_tokens: default_avg_message_tokens(),
            purge_after_days: default_purge_after_days(),
        }
    }
}

impl ContextConfig {
    /// Default settings rooted at a different storage directory
    pub fn with_storage_dir(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retained_tail == 0 {
            return Err(ContextError::Configuration(
                "context.retained_tail must be greater than 0".to_string(),
            ));
        }
        if self.recent_turns_kept > MAX_RECENT_TURNS_KEPT {
            return Err(ContextError::Configuration(format!(
                "context.recent_turns_kept ({}) must be at most {}",
                self.recent_turns_kept, MAX_RECENT_TURNS_KEPT
            )));
        }
        if self.avg_message_tokens <= 0 {
            return Err(ContextError::Configuration(
                "context.avg_message_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Root of the knowledge base (`documents.json`, `documents/`, `chunks/`)
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    /// Chunk window in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks whose trimmed text is shorter than this are dropped
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    #[serde(default = "default_max_title_chars")]
    pub max_title_chars: usize,

    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: usize,
}

fn default_base_path() -> PathBuf {
    PathBuf::from("rag_data/knowledge_base")
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    100
}
fn default_min_chunk_chars() -> usize {
    50
}
fn default_max_title_chars() -> usize {
    500
}
fn default_max_content_bytes() -> usize {
    10_000_000
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_chars: default_min_chunk_chars(),
            max_title_chars: default_max_title_chars(),
            max_content_bytes: default_max_content_bytes(),
        }
    }
}

impl KnowledgeBaseConfig {
    /// Default settings rooted at a different base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ContextError::Configuration(
                "knowledge_base.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ContextError::Configuration(format!(
                "knowledge_base.chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.context.retained_tail, 50);
        assert_eq!(config.context.recent_turns_kept, 5);
        assert_eq!(config.context.avg_message_tokens, 200);
        assert_eq!(config.knowledge_base.chunk_size, 1000);
        assert_eq!(config.knowledge_base.chunk_overlap, 100);
        assert_eq!(config.knowledge_base.min_chunk_chars, 50);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let mut kb = KnowledgeBaseConfig::default();
        kb.chunk_overlap = kb.chunk_size;
        assert!(matches!(kb.validate(), Err(ContextError::Configuration(_))));
    }

    #[test]
    fn test_zero_retained_tail_rejected() {
        let mut ctx = ContextConfig::default();
        ctx.retained_tail = 0;
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn test_recent_turns_kept_bounded() {
        let mut ctx = ContextConfig::default();
        ctx.recent_turns_kept = MAX_RECENT_TURNS_KEPT + 1;
        assert!(matches!(ctx.validate(), Err(ContextError::Configuration(_))));

        ctx.recent_turns_kept = 0;
        assert!(ctx.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
            [context]
            storage_dir = "/tmp/ctx"
            recent_turns_kept = 3

            [knowledge_base]
            chunk_size = 400
            chunk_overlap = 40

            [logging]
            level = "debug"
            json = true
            "#
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.context.storage_dir, PathBuf::from("/tmp/ctx"));
        assert_eq!(config.context.recent_turns_kept, 3);
        assert_eq!(config.context.retained_tail, 50);
        assert_eq!(config.knowledge_base.chunk_size, 400);
        assert_eq!(config.knowledge_base.chunk_overlap, 40);
        assert!(config.logging.json);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[knowledge_base]\nchunk_size = 100\nchunk_overlap = 100\n").unwrap();

        assert!(Config::from_file(&path).is_err());
    }
}
