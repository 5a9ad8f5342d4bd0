//! Metrics collection for observability

use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_with_registry, Counter, CounterVec, Histogram, Opts, Registry,
};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Context window metrics
    pub context_analyses: CounterVec,
    pub context_usage_ratio: Histogram,
    pub context_resets: Counter,
    pub snapshots_persisted: CounterVec,
    pub snapshots_purged: Counter,

    // Document store metrics
    pub documents_added: Counter,
    pub documents_deleted: CounterVec,
    pub chunks_written: Counter,
    pub corrupt_records: Counter,
    pub searches: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Context window metrics
        let context_analyses = register_counter_vec_with_registry!(
            Opts::new("context_analyses_total", "Total context usage analyses"),
            &["status"],
            registry
        )?;

        let context_usage_ratio = register_histogram_with_registry!(
            "context_usage_ratio",
            "Context window usage ratio per analysis",
            vec![0.25, 0.5, 0.75, 0.85, 1.0, 1.5],
            registry
        )?;

        let context_resets = register_counter_with_registry!(
            Opts::new("context_resets_total", "Total context resets performed"),
            registry
        )?;

        let snapshots_persisted = register_counter_vec_with_registry!(
            Opts::new("context_snapshots_persisted_total", "Total snapshot writes"),
            &["status"],
            registry
        )?;

        let snapshots_purged = register_counter_with_registry!(
            Opts::new("context_snapshots_purged_total", "Total snapshots removed by age"),
            registry
        )?;

        // Document store metrics
        let documents_added = register_counter_with_registry!(
            Opts::new("kb_documents_added_total", "Total documents ingested"),
            registry
        )?;

        let documents_deleted = register_counter_vec_with_registry!(
            Opts::new("kb_documents_deleted_total", "Total document deletions"),
            &["status"],
            registry
        )?;

        let chunks_written = register_counter_with_registry!(
            Opts::new("kb_chunks_written_total", "Total chunk files written"),
            registry
        )?;

        let corrupt_records = register_counter_with_registry!(
            Opts::new("kb_corrupt_records_total", "Total stored records skipped as corrupt"),
            registry
        )?;

        let searches = register_counter_vec_with_registry!(
            Opts::new("kb_searches_total", "Total document searches"),
            &["result"],
            registry
        )?;

        Ok(Self {
            registry,
            context_analyses,
            context_usage_ratio,
            context_resets,
            snapshots_persisted,
            snapshots_purged,
            documents_added,
            documents_deleted,
            chunks_written,
            corrupt_records,
            searches,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a usage analysis
    pub fn record_analysis(&self, status: &str, usage_ratio: f64) {
        self.context_analyses.with_label_values(&[status]).inc();
        self.context_usage_ratio.observe(usage_ratio);
    }

    /// Record a reset
    pub fn record_reset(&self) {
        self.context_resets.inc();
    }

    /// Record a snapshot write
    pub fn record_snapshot(&self, success: bool) {
        let status = if success { "success" } else { "error" };
        self.snapshots_persisted.with_label_values(&[status]).inc();
    }

    /// Record purged snapshots
    pub fn record_purge(&self, removed: usize) {
        self.snapshots_purged.inc_by(removed as f64);
    }

    /// Record an ingested document and its chunk count
    pub fn record_document_added(&self, chunk_count: usize) {
        self.documents_added.inc();
        self.chunks_written.inc_by(chunk_count as f64);
    }

    /// Record a document deletion
    pub fn record_document_deleted(&self, complete: bool) {
        let status = if complete { "complete" } else { "partial" };
        self.documents_deleted.with_label_values(&[status]).inc();
    }

    /// Record a skipped corrupt record
    pub fn record_corrupt_record(&self) {
        self.corrupt_records.inc();
    }

    /// Record a search
    pub fn record_search(&self, hits: usize) {
        let result = if hits > 0 { "hit" } else { "miss" };
        self.searches.with_label_values(&[result]).inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }

        String::from_utf8(buffer).unwrap_or_default()
    }
}
