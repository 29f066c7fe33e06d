//! Test support for snapshot flattening.
//!
//! Builds small on-disk snapshots in a temporary directory (manifest, gzip
//! JSONL shards, merged-id files) so pipeline tests exercise the same paths a
//! real run does, plus a few assertion helpers for reading tables back.
//!
//! # Quick Start
//!
//! ```no_run
//! use snapshot_flatten::testing::*;
//! use snapshot_flatten::{EntityKind, FlattenPipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut snap = SnapshotFixture::new()?;
//! snap.add_shard(EntityKind::Works, "2023-01-05", 0, &[sample_work(1, &[10, 11])])?;
//! snap.write_manifest(EntityKind::Works)?;
//!
//! let summary = FlattenPipeline::new(snap.config(EntityKind::Works))?.run()?;
//! assert_eq!(summary.completed, 1);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod snapshot;

pub use assertions::*;
pub use fixtures::*;
pub use snapshot::*;
