//! End-to-end flattening run.
//!
//! ```text
//! manifest ─┐
//!           ├─ pending shards ─► Runner ─► per shard: flatten ─► sink ─► checkpoint
//! checkpoint┘                     ▲
//! skip-set ───────────────────────┘ (shared, read-only)
//! ```
//!
//! Startup work (reading the manifest, loading the skip-set, opening the
//! checkpoint) happens once, before any shard is dispatched; failures there
//! are [`FlattenError::Precondition`]. After that a shard either completes
//! fully (all tables published, then checkpointed) or is reported as failed
//! and left pending for the next run.

use crate::checkpoint::CheckpointStore;
use crate::config::PipelineConfig;
use crate::error::FlattenError;
use crate::flatten::flatten_shard_file;
use crate::manifest::{ManifestEntry, read_manifest};
use crate::metrics::{RunSummary, ShardReport};
use crate::runner::{CancellationToken, Runner, ShardOutcome, TaskError};
use crate::sink::{FileSink, TableSink, write_collection};
use crate::skip_set::{SkipSet, load_skip_set};
use anyhow::anyhow;
use std::sync::Arc;
use std::time::Instant;

/// A configured flattening run for one entity kind.
pub struct FlattenPipeline {
    config: PipelineConfig,
    sink: Arc<dyn TableSink>,
}

impl FlattenPipeline {
    /// Build a pipeline writing files under `config.output_root`.
    ///
    /// # Errors
    /// Returns [`FlattenError::Precondition`] if the configuration is invalid.
    pub fn new(config: PipelineConfig) -> Result<Self, FlattenError> {
        let sink = FileSink::new(&config.output_root, config.format)
            .with_skip_empty(config.skip_empty_tables);
        Self::with_sink(config, Arc::new(sink))
    }

    /// Build a pipeline with a custom sink.
    ///
    /// # Errors
    /// Returns [`FlattenError::Precondition`] if the configuration is invalid.
    pub fn with_sink(config: PipelineConfig, sink: Arc<dyn TableSink>) -> Result<Self, FlattenError> {
        config.validate().map_err(FlattenError::Precondition)?;
        Ok(Self { config, sink })
    }

    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every pending shard.
    ///
    /// # Errors
    /// See [`FlattenPipeline::run_with_cancel`].
    pub fn run(&self) -> Result<RunSummary, FlattenError> {
        self.run_with_cancel(&CancellationToken::new())
    }

    /// Process pending shards until done or cancelled.
    ///
    /// Shard-level failures do not make this return an error; they are listed
    /// in [`RunSummary::failed`].
    ///
    /// # Errors
    /// - [`FlattenError::Precondition`] for an unusable snapshot root,
    ///   manifest, merged-id file or checkpoint.
    /// - [`FlattenError::CheckpointPersist`] if a completed shard could not be
    ///   recorded. The run stops once in-flight shards finish.
    pub fn run_with_cancel(&self, cancel: &CancellationToken) -> Result<RunSummary, FlattenError> {
        let started = Instant::now();
        let cfg = &self.config;
        let entity = cfg.entity;

        if !cfg.snapshot_root.is_dir() {
            return Err(FlattenError::Precondition(anyhow!(
                "snapshot root {} is not a directory",
                cfg.snapshot_root.display()
            )));
        }
        let manifest = read_manifest(&cfg.snapshot_root, entity)?;
        let skip = load_skip_set(&cfg.snapshot_root, entity).map_err(FlattenError::Precondition)?;
        let checkpoint =
            CheckpointStore::open(cfg.checkpoint_dir(), entity).map_err(FlattenError::Precondition)?;

        let mut summary = RunSummary::new(entity);
        summary.manifest_shards = manifest.len();

        let pending: Vec<ManifestEntry> = manifest
            .entries
            .into_iter()
            .filter(|e| !checkpoint.is_complete(&e.shard_id))
            .collect();
        summary.already_complete = summary.manifest_shards - pending.len();
        summary.pending = pending.len();
        let selected = cfg.shard_limit.apply(pending);
        summary.skipped_by_limit = summary.pending - selected.len();

        tracing::info!(
            entity = %entity,
            complete = summary.already_complete,
            pending = summary.pending,
            selected = selected.len(),
            skip_ids = skip.len(),
            workers = cfg.worker_count(),
            "starting run"
        );

        let runner = Runner::new(cfg.worker_count(), cfg.max_attempts);
        let report = runner.dispatch(selected, cancel, |entry| {
            process_shard(entry, &skip, self.sink.as_ref(), &checkpoint)
        })?;

        for outcome in report.outcomes {
            match outcome {
                ShardOutcome::Completed {
                    shard_id,
                    elapsed_ms,
                    report,
                    ..
                } => {
                    tracing::info!(
                        shard = %shard_id,
                        records = report.stats.records_written,
                        elapsed_ms,
                        "shard complete"
                    );
                    summary.record_completed(&report);
                }
                ShardOutcome::Failed(failure) => summary.record_failed(failure),
            }
        }
        summary.not_started = report.not_started.len();
        summary.cancelled = report.cancelled;
        summary.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        summary.log();
        Ok(summary)
    }
}

/// Flatten one shard, publish its tables, then checkpoint it.
fn process_shard(
    entry: &ManifestEntry,
    skip: &SkipSet,
    sink: &dyn TableSink,
    checkpoint: &CheckpointStore,
) -> Result<ShardReport, TaskError> {
    let (rows, stats) =
        flatten_shard_file(&entry.path, entry.entity, skip).map_err(TaskError::Shard)?;
    tracing::trace!(shard = %entry.shard_id, rows = ?rows.row_counts(), "flattened shard");
    let tables = write_collection(sink, &entry.shard_id, &rows).map_err(TaskError::Shard)?;
    checkpoint
        .mark_complete(&entry.shard_id)
        .map_err(|e| TaskError::Fatal(FlattenError::CheckpointPersist(e)))?;
    Ok(ShardReport {
        stats,
        tables: tables
            .into_iter()
            .map(|(table, outcome)| (table.to_string(), outcome))
            .collect(),
    })
}
