//! # snapshot-flatten
//!
//! Flattens a sharded bibliographic snapshot (one directory of gzip-compressed
//! JSON Lines shards per entity kind, plus a manifest) into fixed-schema
//! tables, one file per (shard, output kind).
//!
//! ## Key Features
//!
//! - **Checkpointed** - finished shards are recorded durably; a re-run only
//!   processes what is still pending
//! - **Parallel** - shards are dispatched to a fixed pool of workers
//! - **Failure-isolated** - a bad shard is logged and left pending while the
//!   other workers carry on
//! - **Deterministic output** - the same shard always produces the same rows
//!   under the same destination name
//! - **Parquet or gzip CSV** output (feature-gated)
//!
//! ## Quick Start
//!
//! ```no_run
//! use snapshot_flatten::{EntityKind, FlattenPipeline, PipelineConfig, ShardLimit};
//! use snapshot_flatten::logging::{LogConfig, init_logging};
//!
//! # fn main() -> anyhow::Result<()> {
//! init_logging(&LogConfig::from_env()?)?;
//!
//! let mut config = PipelineConfig::new(
//!     EntityKind::Works,
//!     "./openalex-snapshot",
//!     "./processed-snapshot",
//! );
//! config.workers = Some(4);
//! config.shard_limit = ShardLimit::First(10);
//!
//! let summary = FlattenPipeline::new(config)?.run()?;
//! println!("{} shards completed, {} failed", summary.completed, summary.failed.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## How a run works
//!
//! 1. The [`manifest`] lists the entity's shards with their record counts.
//! 2. The [`checkpoint`] store removes shards finished by earlier runs.
//! 3. The [`skip_set`] of merged-away ids is loaded once and shared read-only.
//! 4. The [`runner`] hands pending shards to workers. Per shard, the
//!    [`flatten`] engine builds one table per output kind, the [`sink`]
//!    publishes each table, and only then is the shard checkpointed.
//! 5. A [`RunSummary`] reports what happened.
//!
//! ## Module Overview
//!
//! - [`ids`] - entity id codec and secondary id cleanup
//! - [`entity`], [`schema`] - entity kinds and their output schemas
//! - [`row`] - typed rows and per-kind tables
//! - [`flatten`] - record to row flattening
//! - [`manifest`], [`skip_set`], [`checkpoint`] - run inputs and state
//! - [`sink`], [`io`] - destination naming and file formats
//! - [`runner`], [`pipeline`] - dispatch and orchestration
//! - [`config`], [`logging`], [`metrics`], [`error`] - ambient concerns
//! - [`testing`] - snapshot fixtures for tests

pub mod checkpoint;
pub mod config;
pub mod entity;
pub mod error;
pub mod flatten;
pub mod ids;
pub mod io;
pub mod logging;
pub mod manifest;
pub mod metrics;
pub mod pipeline;
pub mod row;
pub mod runner;
pub mod schema;
pub mod sink;
pub mod skip_set;
pub mod testing;
pub mod text;

// Re-exports for convenience
pub use checkpoint::CheckpointStore;
pub use config::{PipelineConfig, ShardLimit};
pub use entity::EntityKind;
pub use error::FlattenError;
pub use flatten::{FlattenStats, ShardFlattener};
pub use ids::decode_id;
pub use manifest::{Manifest, ManifestEntry, read_manifest};
pub use metrics::{RunSummary, ShardReport};
pub use pipeline::FlattenPipeline;
pub use row::{Row, RowCollection, Table, Value};
pub use runner::{CancellationToken, Runner, ShardFailure};
pub use schema::OutputSchema;
pub use sink::{FileSink, OutputFormat, TableSink, WriteOutcome};
pub use skip_set::{SkipSet, load_skip_set};
