//! Shard manifests.
//!
//! Each entity kind ships a `manifest` JSON file next to its shards:
//!
//! ```json
//! {
//!   "entries": [
//!     {"url": "s3://openalex/data/works/updated_date=2023-01-05/part_000.gz",
//!      "meta": {"record_count": 1200}}
//!   ],
//!   "meta": {"record_count": 1200}
//! }
//! ```
//!
//! [`read_manifest`] resolves every entry to a local path under the snapshot
//! root and orders entries by ascending record count, so small shards are
//! dispatched first. Ties are broken by shard id to keep the order stable.

use crate::entity::EntityKind;
use crate::error::FlattenError;
use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Storage prefix that manifest URLs carry in front of the data-relative path.
pub const SNAPSHOT_URL_PREFIX: &str = "s3://openalex/data/";

#[derive(Deserialize)]
struct RawManifest {
    entries: Vec<RawEntry>,
    #[serde(default)]
    meta: Option<RawMeta>,
}

#[derive(Deserialize)]
struct RawEntry {
    url: String,
    meta: RawMeta,
}

#[derive(Deserialize)]
struct RawMeta {
    record_count: u64,
}

/// One shard to process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Local path of the compressed shard.
    pub path: PathBuf,
    /// Stable identifier: the shard path relative to `data/`, with `/`
    /// separators (e.g. `works/updated_date=2023-01-05/part_000.gz`).
    pub shard_id: String,
    pub record_count: u64,
    pub entity: EntityKind,
}

/// Every shard of one entity kind, in dispatch order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub entity: EntityKind,
    /// Record count from the manifest summary; falls back to the sum of entries.
    pub total_records: u64,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Location of an entity kind's manifest.
#[must_use]
pub fn manifest_path(snapshot_root: &Path, entity: EntityKind) -> PathBuf {
    snapshot_root
        .join("data")
        .join(entity.as_str())
        .join("manifest")
}

fn shard_id_from_url(url: &str) -> String {
    let rel = url.strip_prefix(SNAPSHOT_URL_PREFIX).unwrap_or(url);
    rel.trim_start_matches('/').to_string()
}

/// Read and order the manifest for an entity kind.
///
/// # Errors
/// Returns [`FlattenError::Precondition`] if the manifest is missing or not
/// in the expected shape.
pub fn read_manifest(
    snapshot_root: impl AsRef<Path>,
    entity: EntityKind,
) -> Result<Manifest, FlattenError> {
    let root = snapshot_root.as_ref();
    let path = manifest_path(root, entity);
    let raw: RawManifest = File::open(&path)
        .with_context(|| format!("open manifest {}", path.display()))
        .and_then(|f| {
            serde_json::from_reader(BufReader::new(f))
                .with_context(|| format!("parse manifest {}", path.display()))
        })
        .map_err(FlattenError::Precondition)?;

    let data_dir = root.join("data");
    let mut entries = Vec::with_capacity(raw.entries.len());
    for raw_entry in raw.entries {
        let shard_id = shard_id_from_url(&raw_entry.url);
        if shard_id.is_empty() {
            return Err(FlattenError::Precondition(anyhow!(
                "manifest {} has an entry with an empty url",
                path.display()
            )));
        }
        entries.push(ManifestEntry {
            path: data_dir.join(&shard_id),
            shard_id,
            record_count: raw_entry.meta.record_count,
            entity,
        });
    }
    entries.sort_by(|a, b| {
        a.record_count
            .cmp(&b.record_count)
            .then_with(|| a.shard_id.cmp(&b.shard_id))
    });

    let summed: u64 = entries.iter().map(|e| e.record_count).sum();
    let total_records = match raw.meta {
        Some(meta) => {
            if meta.record_count != summed {
                tracing::warn!(
                    entity = %entity,
                    summary = meta.record_count,
                    summed,
                    "manifest record count does not match its entries"
                );
            }
            meta.record_count
        }
        None => summed,
    };

    tracing::info!(
        entity = %entity,
        files = entries.len(),
        records = total_records,
        "read manifest"
    );
    Ok(Manifest {
        entity,
        total_records,
        entries,
    })
}
