#![cfg(feature = "io-parquet")]

use arrow::array::{Array, Int64Array, StringArray, TimestampMillisecondArray};
use snapshot_flatten::flatten::flatten_lines;
use snapshot_flatten::io::parquet::read_parquet_batches;
use snapshot_flatten::schema::WORKS_AUTHORSHIPS;
use snapshot_flatten::sink::{output_stem, write_collection};
use snapshot_flatten::testing::sample_work;
use snapshot_flatten::{EntityKind, FileSink, OutputFormat, RowCollection, SkipSet, TableSink, WriteOutcome};
use std::fs;
use std::path::Path;

const SHARD: &str = "works/updated_date=2023-01-05/part_000.gz";

fn works_rows(ids: &[i64]) -> RowCollection {
    let lines: Vec<String> = ids.iter().map(|id| sample_work(*id, &[1, 2]).to_string()).collect();
    flatten_lines(EntityKind::Works, lines.iter().map(String::as_str), &SkipSet::new()).0
}

fn row_count(path: &Path) -> anyhow::Result<usize> {
    Ok(read_parquet_batches(path)?.iter().map(|b| b.num_rows()).sum())
}

#[test]
fn output_stems() {
    assert_eq!(output_stem(SHARD), "2023-01-05_part_000");
    assert_eq!(output_stem("authors/updated_date=2022-12-31/part_012.gz"), "2022-12-31_part_012");
    assert_eq!(output_stem("part_000.gz"), "part_000");
}

#[test]
fn writes_one_file_per_table() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let sink = FileSink::new(tmp.path(), OutputFormat::Parquet);
    let rows = works_rows(&[1, 2, 3]);

    let outcomes = write_collection(&sink, SHARD, &rows)?;
    assert_eq!(outcomes.len(), 12);
    assert_eq!(outcomes[0], ("works", WriteOutcome::Written { rows: 3 }));

    for table in EntityKind::Works.schemas() {
        let dest = sink.destination(SHARD, table);
        assert_eq!(
            dest,
            tmp.path().join(table.table).join("2023-01-05_part_000.parquet")
        );
        assert!(dest.exists(), "missing {}", dest.display());
    }

    // zero-row tables still get a file with the schema
    let mesh = sink.destination(SHARD, EntityKind::Works.schemas()[7]);
    assert_eq!(row_count(&mesh)?, 0);

    // no temp files are left behind
    for entry in fs::read_dir(tmp.path().join("works"))? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        assert!(!name.starts_with('.'), "leftover {name}");
    }
    Ok(())
}

#[test]
fn written_values_match_rows() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let sink = FileSink::new(tmp.path(), OutputFormat::Parquet);
    let rows = works_rows(&[5]);
    write_collection(&sink, SHARD, &rows)?;

    let batches = read_parquet_batches(tmp.path().join("works/2023-01-05_part_000.parquet"))?;
    let batch = &batches[0];
    let ids = batch
        .column_by_name("work_id")
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .unwrap();
    assert_eq!(ids.value(0), 5);
    let doi = batch
        .column_by_name("doi")
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .unwrap();
    assert_eq!(doi.value(0), "10.1000/work.5");
    let updated = batch
        .column_by_name("updated_date")
        .and_then(|c| c.as_any().downcast_ref::<TimestampMillisecondArray>())
        .unwrap();
    assert!(!updated.is_null(0));

    let authorships =
        read_parquet_batches(tmp.path().join("works_authorships/2023-01-05_part_000.parquet"))?;
    let inst = authorships[0]
        .column_by_name("institution_id")
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .unwrap();
    // first author has an institution, second gets the null placeholder
    assert_eq!(inst.len(), 2);
    assert!(!inst.is_null(0));
    assert!(inst.is_null(1));
    Ok(())
}

#[test]
fn existing_destination_is_left_alone() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let sink = FileSink::new(tmp.path(), OutputFormat::Parquet);
    write_collection(&sink, SHARD, &works_rows(&[1, 2]))?;

    let outcomes = write_collection(&sink, SHARD, &works_rows(&[1, 2, 3, 4]))?;
    assert!(outcomes.iter().all(|(_, o)| *o == WriteOutcome::AlreadyPresent));
    assert_eq!(row_count(&tmp.path().join("works/2023-01-05_part_000.parquet"))?, 2);
    Ok(())
}

#[test]
fn partial_outputs_are_completed() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let sink = FileSink::new(tmp.path(), OutputFormat::Parquet);
    let rows = works_rows(&[1]);
    write_collection(&sink, SHARD, &rows)?;

    let removed = tmp.path().join("works_biblio/2023-01-05_part_000.parquet");
    fs::remove_file(&removed)?;
    let outcomes = write_collection(&sink, SHARD, &rows)?;
    let written: Vec<&str> = outcomes
        .iter()
        .filter(|(_, o)| matches!(o, WriteOutcome::Written { .. }))
        .map(|(t, _)| *t)
        .collect();
    assert_eq!(written, vec!["works_biblio"]);
    assert!(removed.exists());
    Ok(())
}

#[test]
fn authorships_are_written_deduplicated() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let sink = FileSink::new(tmp.path(), OutputFormat::Parquet);
    let line = serde_json::json!({
        "id": "W1",
        "authorships": [
            {"author": {"id": "A1"}, "institutions": []},
            {"author": {"id": "A1"}, "institutions": []}
        ]
    })
    .to_string();
    let (rows, _) = flatten_lines(EntityKind::Works, [line.as_str()], &SkipSet::new());
    let table = rows.get("authorships").unwrap();
    assert_eq!(table.len(), 2);

    let outcome = sink.write_table(SHARD, table)?;
    assert_eq!(outcome, WriteOutcome::Written { rows: 1 });
    assert_eq!(row_count(&sink.destination(SHARD, &WORKS_AUTHORSHIPS))?, 1);
    Ok(())
}

#[test]
fn empty_tables_can_be_skipped() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let sink = FileSink::new(tmp.path(), OutputFormat::Parquet).with_skip_empty(true);
    let outcomes = write_collection(&sink, SHARD, &works_rows(&[1]))?;

    let mesh = outcomes.iter().find(|(t, _)| *t == "works_mesh").unwrap();
    assert_eq!(mesh.1, WriteOutcome::SkippedEmpty);
    assert!(!tmp.path().join("works_mesh").exists());
    Ok(())
}
