//! Error taxonomy for a flattening run.
//!
//! Record-level defects never show up here: they are absorbed by the
//! flattener and only counted. What remains are the failures a caller has to
//! react to.

use thiserror::Error;

/// Failures surfaced by a pipeline run.
#[derive(Debug, Error)]
pub enum FlattenError {
    /// Missing or corrupt manifest, unreadable snapshot root, invalid
    /// configuration, unreadable checkpoint. Raised before any shard is dispatched.
    #[error("precondition failed: {0:#}")]
    Precondition(anyhow::Error),

    /// A shard could not be read, decompressed or written. The shard stays
    /// unchecked and is retried by a later run.
    #[error("shard {shard} failed: {error:#}")]
    ShardIo { shard: String, error: anyhow::Error },

    /// The checkpoint could not be persisted. Fatal: continuing would risk
    /// duplicated or lost work on resume.
    #[error("checkpoint persistence failed: {0:#}")]
    CheckpointPersist(anyhow::Error),
}

pub type Result<T, E = FlattenError> = std::result::Result<T, E>;
