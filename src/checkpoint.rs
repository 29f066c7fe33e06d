//! Durable record of finished shards.
//!
//! A run may be interrupted at any point and restarted. The checkpoint store
//! remembers which shards have had every output table written so a restart
//! skips them. The contract:
//!
//! - the store is loaded once at startup; membership queries are answered
//!   from memory afterwards;
//! - [`CheckpointStore::mark_complete`] persists the *whole* set before it
//!   returns, and the in-memory set only changes once that persist succeeded;
//! - persistence writes a temporary file, syncs it and renames it over the
//!   previous one, so a crash leaves either the old or the new set on disk,
//!   never a torn file.
//!
//! Files are `postcard`-encoded with a SHA-256 checksum over the content.
//!
//! ```no_run
//! use snapshot_flatten::checkpoint::CheckpointStore;
//! use snapshot_flatten::entity::EntityKind;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = CheckpointStore::open("./processed/temp", EntityKind::Works)?;
//! if !store.is_complete("works/updated_date=2023-01-05/part_000.gz") {
//!     // ... flatten and write ...
//!     store.mark_complete("works/updated_date=2023-01-05/part_000.gz")?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::entity::EntityKind;
use anyhow::{Context, Result, anyhow};
use postcard::{from_bytes, to_allocvec};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs::{File, create_dir_all, rename};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// On-disk form of the finished set.
#[derive(Serialize, Deserialize)]
struct CheckpointFile {
    entity: EntityKind,
    /// Milliseconds since the epoch when this file was written. Informational.
    updated_at_ms: u64,
    shards: Vec<String>,
    checksum: String,
}

/// Compute the SHA-256 checksum of data as lowercase hex.
#[must_use]
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn content_checksum(entity: EntityKind, shards: &[String]) -> String {
    let mut content = String::from(entity.as_str());
    for s in shards {
        content.push('\n');
        content.push_str(s);
    }
    compute_checksum(content.as_bytes())
}

/// Set of finished shard ids for one entity kind, backed by a file.
///
/// Safe to share between workers: every mutation is serialized under one lock,
/// and the lock is held across the persist so two concurrent marks can never
/// write the file out of order.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    entity: EntityKind,
    finished: Mutex<BTreeSet<String>>,
}

impl CheckpointStore {
    /// File name of the checkpoint for an entity kind.
    #[must_use]
    pub fn file_name(entity: EntityKind) -> String {
        format!("finished_{entity}.ckpt")
    }

    /// Open (or start) the checkpoint for an entity kind inside `dir`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created, or an existing
    /// checkpoint cannot be read, does not decode, belongs to another entity
    /// kind or fails its checksum.
    pub fn open(dir: impl AsRef<Path>, entity: EntityKind) -> Result<Self> {
        let dir = dir.as_ref();
        create_dir_all(dir)
            .with_context(|| format!("create checkpoint directory {}", dir.display()))?;
        let path = dir.join(Self::file_name(entity));

        let finished = if path.exists() {
            let shards = load_checkpoint(&path, entity)?;
            tracing::info!(entity = %entity, finished = shards.len(), "loaded checkpoint");
            shards.into_iter().collect()
        } else {
            BTreeSet::new()
        };

        Ok(Self {
            path,
            entity,
            finished: Mutex::new(finished),
        })
    }

    /// Location of the checkpoint file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        // The set is only replaced after a successful persist, so a panic
        // while the lock was held cannot have left it half-updated.
        self.finished.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_complete(&self, shard_id: &str) -> bool {
        self.lock().contains(shard_id)
    }

    /// Record a shard as finished and persist the full set before returning.
    ///
    /// Marking an already finished shard is a no-op.
    ///
    /// # Errors
    /// Returns an error if the checkpoint cannot be written. The shard is then
    /// *not* recorded in memory either.
    pub fn mark_complete(&self, shard_id: &str) -> Result<()> {
        let mut finished = self.lock();
        if finished.contains(shard_id) {
            return Ok(());
        }
        finished.insert(shard_id.to_string());
        if let Err(e) = self.persist(&finished) {
            finished.remove(shard_id);
            return Err(e);
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Finished shard ids in sorted order.
    #[must_use]
    pub fn finished(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    fn persist(&self, finished: &BTreeSet<String>) -> Result<()> {
        let shards: Vec<String> = finished.iter().cloned().collect();
        let updated_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        let file = CheckpointFile {
            entity: self.entity,
            updated_at_ms,
            checksum: content_checksum(self.entity, &shards),
            shards,
        };
        let encoded = to_allocvec(&file).context("serialize checkpoint")?;

        let tmp = self.path.with_extension("ckpt.tmp");
        {
            let mut f = File::create(&tmp)
                .with_context(|| format!("create checkpoint temp file {}", tmp.display()))?;
            f.write_all(&encoded)
                .with_context(|| format!("write checkpoint {}", tmp.display()))?;
            f.sync_all()
                .with_context(|| format!("sync checkpoint {}", tmp.display()))?;
        }
        rename(&tmp, &self.path)
            .with_context(|| format!("replace checkpoint {}", self.path.display()))?;
        if let Some(dir) = self.path.parent() {
            // Directory fsync is not supported everywhere; the rename itself already happened.
            if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
                tracing::debug!(dir = %dir.display(), error = %e, "could not sync checkpoint directory");
            }
        }
        Ok(())
    }
}

/// Read and verify a checkpoint file.
fn load_checkpoint(path: &Path, entity: EntityKind) -> Result<Vec<String>> {
    let mut f = File::open(path).with_context(|| format!("open checkpoint {}", path.display()))?;
    let mut encoded = Vec::new();
    f.read_to_end(&mut encoded)
        .with_context(|| format!("read checkpoint {}", path.display()))?;
    let file: CheckpointFile = from_bytes(&encoded)
        .with_context(|| format!("deserialize checkpoint {}", path.display()))?;

    if file.entity != entity {
        return Err(anyhow!(
            "checkpoint {} belongs to {}, not {}",
            path.display(),
            file.entity,
            entity
        ));
    }
    if content_checksum(file.entity, &file.shards) != file.checksum {
        return Err(anyhow!(
            "checkpoint {} failed its integrity check: checksum mismatch",
            path.display()
        ));
    }
    Ok(file.shards)
}
