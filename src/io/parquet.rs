//! Parquet output for flattened tables.
//!
//! - [`arrow_schema`] maps an [`OutputSchema`] to an Arrow schema with the
//!   declared column types and nullability.
//! - [`write_table_parquet`] writes rows as a single record batch.
//! - [`read_parquet_batches`] reads a file back, mostly for verification.
//!
//! Timestamps are written as `Timestamp(Millisecond, "UTC")`. Files are
//! Snappy-compressed.

use crate::row::{Row, Value};
use crate::schema::{ColumnType, OutputSchema};
use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int16Array, Int64Array, StringArray,
    TimestampMillisecondArray, UInt8Array, UInt16Array, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

fn data_type(ty: ColumnType) -> DataType {
    match ty {
        ColumnType::Int64 => DataType::Int64,
        ColumnType::Int16 => DataType::Int16,
        ColumnType::UInt8 => DataType::UInt8,
        ColumnType::UInt16 => DataType::UInt16,
        ColumnType::UInt32 => DataType::UInt32,
        ColumnType::Float64 => DataType::Float64,
        ColumnType::Boolean => DataType::Boolean,
        ColumnType::Utf8 => DataType::Utf8,
        ColumnType::TimestampMs => DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
    }
}

/// Arrow schema for an output table.
#[must_use]
pub fn arrow_schema(schema: &OutputSchema) -> SchemaRef {
    let fields: Vec<Field> = schema
        .columns
        .iter()
        .map(|c| Field::new(c.name, data_type(c.ty), c.nullable))
        .collect();
    Arc::new(Schema::new(fields))
}

fn ints<'a, T: TryFrom<i64>>(cells: impl Iterator<Item = &'a Value>) -> Vec<Option<T>> {
    cells
        .map(|v| v.as_int().and_then(|i| T::try_from(i).ok()))
        .collect()
}

static NULL: Value = Value::Null;

fn column_array(ty: ColumnType, rows: &[&Row], idx: usize) -> ArrayRef {
    let cells = || rows.iter().map(move |r| r.values().get(idx).unwrap_or(&NULL));
    match ty {
        ColumnType::Int64 => Arc::new(Int64Array::from(ints::<i64>(cells()))),
        ColumnType::Int16 => Arc::new(Int16Array::from(ints::<i16>(cells()))),
        ColumnType::UInt8 => Arc::new(UInt8Array::from(ints::<u8>(cells()))),
        ColumnType::UInt16 => Arc::new(UInt16Array::from(ints::<u16>(cells()))),
        ColumnType::UInt32 => Arc::new(UInt32Array::from(ints::<u32>(cells()))),
        ColumnType::Float64 => Arc::new(Float64Array::from(
            cells()
                .map(|v| match v {
                    Value::Float(f) => Some(f.0),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnType::Boolean => Arc::new(BooleanArray::from(
            cells()
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnType::Utf8 => Arc::new(StringArray::from(
            cells().map(Value::as_text).collect::<Vec<_>>(),
        )),
        ColumnType::TimestampMs => Arc::new(
            TimestampMillisecondArray::from(
                cells()
                    .map(|v| match v {
                        Value::Timestamp(ms) => Some(*ms),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            )
            .with_timezone("UTC"),
        ),
    }
}

/// Write rows of one table to a Parquet file. A zero-row file still carries
/// the full schema.
///
/// # Returns
/// Number of rows written.
///
/// # Errors
/// Returns an error if the batch cannot be assembled or the file cannot be
/// created or written.
pub fn write_table_parquet(
    path: impl AsRef<Path>,
    schema: &OutputSchema,
    rows: &[&Row],
) -> Result<usize> {
    let path = path.as_ref();
    let arrow = arrow_schema(schema);
    let columns: Vec<ArrayRef> = schema
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| column_array(c.ty, rows, i))
        .collect();
    let batch = RecordBatch::try_new(arrow.clone(), columns)
        .with_context(|| format!("assemble {} batch", schema.table))?;

    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer =
        ArrowWriter::try_new(file, arrow, Some(props)).context("create ArrowWriter")?;
    writer.write(&batch).context("write batch to parquet")?;
    writer.close().context("close ArrowWriter")?;
    Ok(rows.len())
}

/// Read every record batch of a Parquet file.
///
/// # Errors
/// Returns an error if the file cannot be opened or decoded.
pub fn read_parquet_batches(path: impl AsRef<Path>) -> Result<Vec<RecordBatch>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("open ParquetRecordBatchReader")?
        .with_batch_size(64 * 1024)
        .build()
        .context("build ParquetRecordBatchReader")?;
    reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("read batches from {}", path.display()))
}
