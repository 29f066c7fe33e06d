//! CSV I/O.
//!
//! - [`write_table_csv`] writes one output table with a header row, compressed
//!   by extension (`.csv.gz`). Nulls are empty cells, timestamps are ISO-8601.
//! - [`read_csv_column`] pulls a single named column out of a headed CSV file;
//!   merged-id lists are read this way.
//! - [`read_csv_records`] returns header and rows as strings.

use crate::io::compression::{auto_detect_reader, auto_detect_writer};
use crate::row::{Row, Value, format_timestamp_ms};
use crate::schema::OutputSchema;
use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, WriterBuilder};
use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

fn render(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::Int(v) => Cow::Owned(v.to_string()),
        Value::Float(f) => Cow::Owned(f.0.to_string()),
        Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        Value::Text(s) => Cow::Borrowed(s),
        Value::Timestamp(ms) => Cow::Owned(format_timestamp_ms(*ms).unwrap_or_default()),
    }
}

/// Write rows of one table to a CSV file. A zero-row file still has the header.
///
/// # Returns
/// Number of rows written.
///
/// # Errors
/// Returns an error if the file cannot be created, a row fails to serialize or
/// the compressed stream cannot be finished.
pub fn write_table_csv(
    path: impl AsRef<Path>,
    schema: &OutputSchema,
    rows: &[&Row],
) -> Result<usize> {
    let path = path.as_ref();
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let w = auto_detect_writer(f, path)
        .with_context(|| format!("setup compression for {}", path.display()))?;
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(w);
    wtr.write_record(schema.column_names())
        .with_context(|| format!("write header to {}", path.display()))?;
    for (i, row) in rows.iter().enumerate() {
        wtr.write_record(row.values().iter().map(|v| render(v).into_owned()))
            .with_context(|| format!("write row #{} to {}", i + 1, path.display()))?;
    }
    let w = wtr
        .into_inner()
        .map_err(|e| anyhow!("flush {}: {}", path.display(), e.error()))?;
    w.finish()
        .with_context(|| format!("finish {}", path.display()))?;
    Ok(rows.len())
}

/// Read a headed CSV file into its header and string rows.
///
/// # Errors
/// Returns an error if the file cannot be opened, decompressed or parsed.
pub fn read_csv_records(path: impl AsRef<Path>) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rdr = auto_detect_reader(f, path)
        .with_context(|| format!("setup decompression for {}", path.display()))?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(rdr);
    let header = rdr
        .headers()
        .with_context(|| format!("read header of {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("parse CSV record #{} in {}", i + 1, path.display()))?;
        rows.push(rec.iter().map(str::to_string).collect());
    }
    Ok((header, rows))
}

/// Values of one named column, in file order.
///
/// # Errors
/// Returns an error if the file cannot be read or has no such column.
pub fn read_csv_column(path: impl AsRef<Path>, column: &str) -> Result<Vec<String>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rdr = auto_detect_reader(f, path)
        .with_context(|| format!("setup decompression for {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(rdr);
    let idx = rdr
        .headers()
        .with_context(|| format!("read header of {}", path.display()))?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| anyhow!("{} has no `{column}` column", path.display()))?;
    let mut out = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("parse CSV record #{} in {}", i + 1, path.display()))?;
        if let Some(v) = rec.get(idx) {
            out.push(v.to_string());
        }
    }
    Ok(out)
}
