//! Run summary.
//!
//! A [`RunSummary`] aggregates the outcome of one pipeline run: shard counts,
//! record counters from the flattener and rows written per table. It can be
//! logged, rendered as JSON or saved to a file.
//!
//! ```no_run
//! use snapshot_flatten::{FlattenPipeline, PipelineConfig, EntityKind};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = PipelineConfig::new(EntityKind::Works, "./snapshot", "./processed");
//! let summary = FlattenPipeline::new(config)?.run()?;
//! summary.log();
//! summary.save_to_file("./processed/run_summary.json")?;
//! # Ok(())
//! # }
//! ```

use crate::entity::EntityKind;
use crate::flatten::FlattenStats;
use crate::runner::ShardFailure;
use crate::sink::WriteOutcome;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// What one completed shard contributed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardReport {
    pub stats: FlattenStats,
    /// Write outcome per table name, in schema order.
    pub tables: Vec<(String, WriteOutcome)>,
}

/// Outcome of a pipeline run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub entity: EntityKind,
    /// Shards in the manifest.
    pub manifest_shards: usize,
    /// Shards already checkpointed before this run.
    pub already_complete: usize,
    /// Shards that were pending when the run started.
    pub pending: usize,
    /// Pending shards left out by the shard limit.
    pub skipped_by_limit: usize,
    /// Shards completed and checkpointed by this run.
    pub completed: usize,
    pub failed: Vec<ShardFailure>,
    /// Shards not started because the run was cancelled.
    pub not_started: usize,
    pub cancelled: bool,
    pub records_read: u64,
    pub records_written: u64,
    pub records_merged: u64,
    pub records_without_id: u64,
    pub malformed_lines: u64,
    /// Rows published per table. Tables whose destination already existed
    /// contribute nothing.
    pub rows_per_table: BTreeMap<String, u64>,
    pub elapsed_ms: u64,
}

impl RunSummary {
    #[must_use]
    pub fn new(entity: EntityKind) -> Self {
        Self {
            entity,
            manifest_shards: 0,
            already_complete: 0,
            pending: 0,
            skipped_by_limit: 0,
            completed: 0,
            failed: Vec::new(),
            not_started: 0,
            cancelled: false,
            records_read: 0,
            records_written: 0,
            records_merged: 0,
            records_without_id: 0,
            malformed_lines: 0,
            rows_per_table: BTreeMap::new(),
            elapsed_ms: 0,
        }
    }

    /// Fold in a completed shard.
    pub fn record_completed(&mut self, report: &ShardReport) {
        self.completed += 1;
        let s = &report.stats;
        self.records_read += s.records_read;
        self.records_written += s.records_written;
        self.records_merged += s.records_merged;
        self.records_without_id += s.records_without_id;
        self.malformed_lines += s.malformed_lines;
        for (table, outcome) in &report.tables {
            let entry = self.rows_per_table.entry(table.clone()).or_default();
            if let WriteOutcome::Written { rows } = outcome {
                *entry += *rows as u64;
            }
        }
    }

    pub fn record_failed(&mut self, failure: ShardFailure) {
        self.failed.push(failure);
    }

    /// Whether every shard this run took on was completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Emit the summary as a structured `info` event, plus one `warn` per failed shard.
    pub fn log(&self) {
        tracing::info!(
            entity = %self.entity,
            pending = self.pending,
            completed = self.completed,
            failed = self.failed.len(),
            skipped_by_limit = self.skipped_by_limit,
            not_started = self.not_started,
            cancelled = self.cancelled,
            records_read = self.records_read,
            records_written = self.records_written,
            records_merged = self.records_merged,
            records_without_id = self.records_without_id,
            malformed_lines = self.malformed_lines,
            elapsed_ms = self.elapsed_ms,
            "run finished"
        );
        for f in &self.failed {
            tracing::warn!(shard = %f.shard_id, attempts = f.attempts, error = %f.error, "shard left pending");
        }
    }

    /// Save the summary as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("serialize run summary")?;
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}
