//! Superseded identifiers.
//!
//! When upstream merges two entities, the losing id keeps appearing in older
//! shards. Those ids are listed under `data/merged_ids/<entity>/` as headed
//! CSV files (usually gzipped) with an `id` column; records carrying one of
//! them are dropped before flattening.

use crate::entity::EntityKind;
use crate::ids::decode_id;
use crate::io::csv::read_csv_column;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Read-only set of decoded ids to exclude. Shared by all workers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SkipSet {
    ids: HashSet<i64>,
}

impl SkipSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<i64> for SkipSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Directory holding merged-id files for an entity kind.
#[must_use]
pub fn merged_ids_dir(snapshot_root: &Path, entity: EntityKind) -> PathBuf {
    snapshot_root
        .join("data")
        .join("merged_ids")
        .join(entity.as_str())
}

/// Load the skip-set for an entity kind.
///
/// A missing directory yields an empty set. Ids that fail to decode are
/// ignored; the loaded set only ever contains decodable ids.
///
/// # Errors
/// Returns an error if a merged-id file exists but cannot be read or lacks an
/// `id` column.
pub fn load_skip_set(snapshot_root: impl AsRef<Path>, entity: EntityKind) -> Result<SkipSet> {
    let dir = merged_ids_dir(snapshot_root.as_ref(), entity);
    if !dir.is_dir() {
        tracing::info!(entity = %entity, dir = %dir.display(), "no merged ids directory");
        return Ok(SkipSet::new());
    }

    let pattern = dir.join("*.csv*");
    let pattern = pattern.to_string_lossy();
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("bad glob pattern {pattern}"))?
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("list {}", dir.display()))?;
    files.sort();

    let mut ids = HashSet::new();
    let mut undecodable = 0usize;
    for file in &files {
        for raw in read_csv_column(file, "id")? {
            match decode_id(Some(&raw)) {
                Some(id) => {
                    ids.insert(id);
                }
                None => undecodable += 1,
            }
        }
    }
    tracing::info!(
        entity = %entity,
        files = files.len(),
        ids = ids.len(),
        undecodable,
        "loaded merged ids"
    );
    Ok(SkipSet { ids })
}
