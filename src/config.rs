//! Pipeline configuration.

use crate::entity::EntityKind;
use crate::sink::OutputFormat;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// How many pending shards a run may take on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardLimit {
    /// Every pending shard.
    #[default]
    All,
    /// Only the first `n` pending shards in dispatch order.
    First(usize),
}

impl ShardLimit {
    /// Apply the limit to a dispatch-ordered list.
    #[must_use]
    pub fn apply<T>(self, mut items: Vec<T>) -> Vec<T> {
        if let Self::First(n) = self {
            items.truncate(n);
        }
        items
    }
}

/// Everything a run needs, passed in explicitly at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Snapshot directory; manifests live under `data/<entity>/manifest`.
    pub snapshot_root: PathBuf,
    /// Root directory for per-table output directories.
    pub output_root: PathBuf,
    /// Where checkpoint files live. Defaults to `<output_root>/temp`.
    pub checkpoint_dir: Option<PathBuf>,
    /// Entity kind to flatten.
    pub entity: EntityKind,
    /// Worker count. `None` uses every available core.
    pub workers: Option<usize>,
    /// Cap on the number of pending shards processed by this run.
    pub shard_limit: ShardLimit,
    /// Tabular container for outputs.
    pub format: OutputFormat,
    /// Attempts per shard before it is reported as failed.
    pub max_attempts: u32,
    /// Do not create files for tables that received no rows.
    pub skip_empty_tables: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            snapshot_root: PathBuf::from("./openalex-snapshot"),
            output_root: PathBuf::from("./processed-snapshot"),
            checkpoint_dir: None,
            entity: EntityKind::Works,
            workers: None,
            shard_limit: ShardLimit::All,
            format: OutputFormat::default(),
            max_attempts: 2,
            skip_empty_tables: false,
        }
    }
}

impl PipelineConfig {
    /// A config for one entity with the given roots and defaults elsewhere.
    #[must_use]
    pub fn new(
        entity: EntityKind,
        snapshot_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            entity,
            snapshot_root: snapshot_root.into(),
            output_root: output_root.into(),
            ..Self::default()
        }
    }

    /// Load a config from a JSON file. Missing keys take their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or is not valid JSON.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
        serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse config {}", path.display()))
    }

    /// Resolved checkpoint directory.
    #[must_use]
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.checkpoint_dir
            .clone()
            .unwrap_or_else(|| self.output_root.join("temp"))
    }

    /// Resolved worker count (at least one).
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Reject settings that cannot produce a meaningful run.
    ///
    /// # Errors
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.snapshot_root.as_os_str().is_empty() {
            bail!("snapshot_root is empty");
        }
        if self.output_root.as_os_str().is_empty() {
            bail!("output_root is empty");
        }
        if self.workers == Some(0) {
            bail!("workers must be at least 1");
        }
        if self.max_attempts == 0 {
            bail!("max_attempts must be at least 1");
        }
        Ok(())
    }
}
