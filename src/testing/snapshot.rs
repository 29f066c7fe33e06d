//! On-disk snapshot fixtures.

use crate::config::PipelineConfig;
use crate::entity::EntityKind;
use crate::io::compression::auto_detect_writer;
use crate::io::jsonl::write_jsonl_vec;
use crate::manifest::{SNAPSHOT_URL_PREFIX, manifest_path};
use crate::skip_set::merged_ids_dir;
use anyhow::{Context, Result, anyhow};
use serde_json::{Value as Json, json};
use std::collections::BTreeMap;
use std::fs::{File, create_dir_all, write};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A snapshot laid out the way the upstream dump is:
///
/// ```text
/// <root>/snapshot/data/<entity>/manifest
/// <root>/snapshot/data/<entity>/updated_date=<date>/part_<nnn>.gz
/// <root>/snapshot/data/merged_ids/<entity>/<name>.csv.gz
/// <root>/output/
/// ```
///
/// Everything is removed when the fixture is dropped.
pub struct SnapshotFixture {
    dir: TempDir,
    /// Manifest entries per entity: (shard id, record count).
    shards: BTreeMap<EntityKind, Vec<(String, u64)>>,
}

impl SnapshotFixture {
    /// Create an empty snapshot in a fresh temporary directory.
    ///
    /// # Errors
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("create temp dir")?;
        create_dir_all(dir.path().join("snapshot").join("data"))
            .context("create snapshot data dir")?;
        Ok(Self {
            dir,
            shards: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn snapshot_root(&self) -> PathBuf {
        self.dir.path().join("snapshot")
    }

    #[must_use]
    pub fn output_root(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Shard id for a date partition and part number.
    #[must_use]
    pub fn shard_id(entity: EntityKind, date: &str, part: usize) -> String {
        format!("{entity}/updated_date={date}/part_{part:03}.gz")
    }

    /// Write a gzip JSONL shard and remember it for the manifest.
    ///
    /// # Returns
    /// The shard id.
    ///
    /// # Errors
    /// Returns an error if the shard cannot be written.
    pub fn add_shard(
        &mut self,
        entity: EntityKind,
        date: &str,
        part: usize,
        records: &[Json],
    ) -> Result<String> {
        let shard_id = Self::shard_id(entity, date, part);
        let path = self.shard_path(&shard_id);
        write_jsonl_vec(&path, records)?;
        self.register(entity, &shard_id, records.len() as u64);
        Ok(shard_id)
    }

    /// Write a shard from raw lines, for inputs that are not valid JSON.
    ///
    /// # Errors
    /// Returns an error if the shard cannot be written.
    pub fn add_raw_shard(
        &mut self,
        entity: EntityKind,
        date: &str,
        part: usize,
        lines: &[&str],
    ) -> Result<String> {
        let shard_id = Self::shard_id(entity, date, part);
        let path = self.shard_path(&shard_id);
        if let Some(dir) = path.parent() {
            create_dir_all(dir).with_context(|| format!("mkdir -p {}", dir.display()))?;
        }
        let f = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        let mut w = auto_detect_writer(f, &path)?;
        for line in lines {
            writeln!(w, "{line}").with_context(|| format!("write {}", path.display()))?;
        }
        w.finish()
            .with_context(|| format!("finish {}", path.display()))?;
        self.register(entity, &shard_id, lines.len() as u64);
        Ok(shard_id)
    }

    /// List a shard in the manifest without creating its file.
    pub fn add_missing_shard(&mut self, entity: EntityKind, date: &str, part: usize) -> String {
        let shard_id = Self::shard_id(entity, date, part);
        self.register(entity, &shard_id, 1);
        shard_id
    }

    /// Overwrite a shard's file with bytes that do not decompress.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn corrupt_shard(&self, shard_id: &str) -> Result<()> {
        let path = self.shard_path(shard_id);
        write(&path, b"\x1f\x8bthis is not a gzip stream")
            .with_context(|| format!("corrupt {}", path.display()))
    }

    /// Local path of a shard.
    #[must_use]
    pub fn shard_path(&self, shard_id: &str) -> PathBuf {
        self.snapshot_root().join("data").join(shard_id)
    }

    fn register(&mut self, entity: EntityKind, shard_id: &str, records: u64) {
        self.shards
            .entry(entity)
            .or_default()
            .push((shard_id.to_string(), records));
    }

    /// Write the manifest for every shard added for `entity` so far.
    ///
    /// # Errors
    /// Returns an error if no shard was added or the file cannot be written.
    pub fn write_manifest(&self, entity: EntityKind) -> Result<PathBuf> {
        let shards = self
            .shards
            .get(&entity)
            .ok_or_else(|| anyhow!("no shards added for {entity}"))?;
        let entries: Vec<Json> = shards
            .iter()
            .map(|(id, count)| {
                json!({
                    "url": format!("{SNAPSHOT_URL_PREFIX}{id}"),
                    "meta": {"content_length": 0, "record_count": count}
                })
            })
            .collect();
        let total: u64 = shards.iter().map(|(_, c)| c).sum();
        let manifest = json!({"entries": entries, "meta": {"content_length": 0, "record_count": total}});

        let path = manifest_path(&self.snapshot_root(), entity);
        if let Some(dir) = path.parent() {
            create_dir_all(dir).with_context(|| format!("mkdir -p {}", dir.display()))?;
        }
        write(&path, manifest.to_string())
            .with_context(|| format!("write manifest {}", path.display()))?;
        Ok(path)
    }

    /// Write a merged-id file (`merge_date,id,merge_into_id`) for `entity`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn add_merged_ids(&self, entity: EntityKind, name: &str, ids: &[&str]) -> Result<PathBuf> {
        let dir = merged_ids_dir(&self.snapshot_root(), entity);
        create_dir_all(&dir).with_context(|| format!("mkdir -p {}", dir.display()))?;
        let path = dir.join(format!("{name}.csv.gz"));
        let f = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        let w = auto_detect_writer(f, &path)?;
        let mut wtr = csv::Writer::from_writer(w);
        wtr.write_record(["merge_date", "id", "merge_into_id"])?;
        for id in ids {
            wtr.write_record(["2023-01-01", id, "W1"])?;
        }
        let w = wtr
            .into_inner()
            .map_err(|e| anyhow!("flush {}: {}", path.display(), e.error()))?;
        w.finish()
            .with_context(|| format!("finish {}", path.display()))?;
        Ok(path)
    }

    /// Pipeline configuration pointing at this snapshot, with two workers.
    #[must_use]
    pub fn config(&self, entity: EntityKind) -> PipelineConfig {
        let mut config = PipelineConfig::new(entity, self.snapshot_root(), self.output_root());
        config.workers = Some(2);
        config
    }
}
