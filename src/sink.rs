//! Output sink.
//!
//! Every (shard, output kind) pair maps to exactly one destination file:
//!
//! ```text
//! <output_root>/<table>/<stem>.<ext>
//! ```
//!
//! where `stem` comes from the shard id via [`output_stem`] and `ext` from the
//! [`OutputFormat`]. A destination that already exists is complete: files are
//! written under a hidden temporary name in the same directory and renamed
//! into place only once fully written and synced. Re-running a shard whose
//! outputs partly exist therefore only fills in the missing tables.

use crate::io::compression::strip_compression_extension;
use crate::row::{RowCollection, Table};
use crate::schema::OutputSchema;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::{File, create_dir_all, remove_file, rename};
use std::path::{Path, PathBuf};

/// Tabular container for output files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Parquet,
    /// Gzip-compressed CSV with a header row.
    CsvGz,
}

impl OutputFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::CsvGz => "csv.gz",
        }
    }
}

/// Result of writing one table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    /// A new file was published with this many rows.
    Written { rows: usize },
    /// The destination already existed and was left alone.
    AlreadyPresent,
    /// The table had no rows and empty tables are not written.
    SkippedEmpty,
}

/// Writes the tables of one shard.
///
/// Implementations must be idempotent per destination: writing a table whose
/// destination already exists is a no-op that reports
/// [`WriteOutcome::AlreadyPresent`].
pub trait TableSink: Send + Sync {
    /// Write one table produced from `shard_id`.
    ///
    /// # Errors
    /// Returns an error if the table cannot be durably written.
    fn write_table(&self, shard_id: &str, table: &Table) -> Result<WriteOutcome>;
}

/// File name stem for a shard's outputs: the last two path components joined
/// with `_`, minus `updated_date=` and the compression extension.
///
/// ```
/// use snapshot_flatten::sink::output_stem;
///
/// assert_eq!(
///     output_stem("works/updated_date=2023-01-05/part_000.gz"),
///     "2023-01-05_part_000"
/// );
/// ```
#[must_use]
pub fn output_stem(shard_id: &str) -> String {
    let mut parts: Vec<&str> = shard_id.rsplit('/').take(2).collect();
    parts.reverse();
    let joined = parts.join("_").replace("updated_date=", "");
    strip_compression_extension(&joined).to_string()
}

/// Writes tables as files under an output root.
#[derive(Clone, Debug)]
pub struct FileSink {
    root: PathBuf,
    format: OutputFormat,
    skip_empty: bool,
}

impl FileSink {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            root: root.into(),
            format,
            skip_empty: false,
        }
    }

    /// Do not create files for tables without rows.
    #[must_use]
    pub const fn with_skip_empty(mut self, skip_empty: bool) -> Self {
        self.skip_empty = skip_empty;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination file for one (shard, table) pair.
    #[must_use]
    pub fn destination(&self, shard_id: &str, schema: &OutputSchema) -> PathBuf {
        self.root.join(schema.table).join(format!(
            "{}.{}",
            output_stem(shard_id),
            self.format.extension()
        ))
    }

    fn write_file(&self, path: &Path, table: &Table) -> Result<usize> {
        let rows = table.rows_to_write();
        match self.format {
            #[cfg(feature = "io-parquet")]
            OutputFormat::Parquet => crate::io::parquet::write_table_parquet(path, table.schema, &rows),
            #[cfg(not(feature = "io-parquet"))]
            OutputFormat::Parquet => bail!("parquet output requires the `io-parquet` feature"),
            #[cfg(feature = "io-csv")]
            OutputFormat::CsvGz => crate::io::csv::write_table_csv(path, table.schema, &rows),
            #[cfg(not(feature = "io-csv"))]
            OutputFormat::CsvGz => bail!("csv output requires the `io-csv` feature"),
        }
    }
}

/// Hidden sibling used while a destination is being written. It keeps the
/// destination's extension so the writer picks the same compression.
fn temp_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".tmp.{name}"))
}

impl TableSink for FileSink {
    fn write_table(&self, shard_id: &str, table: &Table) -> Result<WriteOutcome> {
        let dest = self.destination(shard_id, table.schema);
        if dest.exists() {
            tracing::debug!(shard = shard_id, table = table.schema.table, "destination exists, skipping");
            return Ok(WriteOutcome::AlreadyPresent);
        }
        if self.skip_empty && table.is_empty() {
            return Ok(WriteOutcome::SkippedEmpty);
        }
        let Some(dir) = dest.parent() else {
            bail!("destination {} has no parent directory", dest.display());
        };
        create_dir_all(dir).with_context(|| format!("mkdir -p {}", dir.display()))?;

        let tmp = temp_path(&dest);
        let written = self.write_file(&tmp, table).and_then(|rows| {
            File::open(&tmp)
                .and_then(|f| f.sync_all())
                .with_context(|| format!("sync {}", tmp.display()))?;
            rename(&tmp, &dest)
                .with_context(|| format!("publish {}", dest.display()))?;
            Ok(rows)
        });
        match written {
            Ok(rows) => {
                tracing::trace!(shard = shard_id, table = table.schema.table, rows, "wrote table");
                Ok(WriteOutcome::Written { rows })
            }
            Err(e) => {
                let _ = remove_file(&tmp);
                Err(e)
            }
        }
    }
}

/// Write every table of a shard, in schema order.
///
/// # Returns
/// The outcome per table name.
///
/// # Errors
/// Returns the first write error; tables after it are not attempted.
pub fn write_collection(
    sink: &dyn TableSink,
    shard_id: &str,
    rows: &RowCollection,
) -> Result<Vec<(&'static str, WriteOutcome)>> {
    rows.tables()
        .iter()
        .map(|table| {
            sink.write_table(shard_id, table)
                .with_context(|| format!("write {} for {shard_id}", table.schema.table))
                .map(|outcome| (table.schema.table, outcome))
        })
        .collect()
}
