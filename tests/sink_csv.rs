#![cfg(all(feature = "io-csv", feature = "compression-gzip"))]

use snapshot_flatten::flatten::flatten_lines;
use snapshot_flatten::io::csv::read_csv_records;
use snapshot_flatten::sink::write_collection;
use snapshot_flatten::testing::sample_venue;
use snapshot_flatten::{EntityKind, FileSink, OutputFormat, SkipSet, WriteOutcome};
use std::fs::File;
use std::io::Read;

const SHARD: &str = "venues/updated_date=2023-01-05/part_003.gz";

#[test]
fn writes_gzip_csv_with_header() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let sink = FileSink::new(tmp.path(), OutputFormat::CsvGz);
    let line = sample_venue(3).to_string();
    let (rows, _) = flatten_lines(EntityKind::Venues, [line.as_str()], &SkipSet::new());

    let outcomes = write_collection(&sink, SHARD, &rows)?;
    assert_eq!(outcomes[0], ("venues", WriteOutcome::Written { rows: 1 }));

    let path = tmp.path().join("venues/2023-01-05_part_003.csv.gz");
    let mut magic = [0u8; 2];
    File::open(&path)?.read_exact(&mut magic)?;
    assert_eq!(magic, [0x1f, 0x8b]);

    let (header, records) = read_csv_records(&path)?;
    assert_eq!(header[0], "venue_id");
    assert_eq!(records.len(), 1);
    let col = |name: &str| header.iter().position(|h| h == name).unwrap();
    assert_eq!(records[0][col("venue_id")], "3");
    assert_eq!(records[0][col("issn")], r#"["1234-5678","8765-4321"]"#);
    assert_eq!(records[0][col("is_oa")], "false");
    assert_eq!(records[0][col("updated_date")], "2023-01-05T00:00:00.000Z");
    Ok(())
}

#[test]
fn nulls_are_empty_cells() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let sink = FileSink::new(tmp.path(), OutputFormat::CsvGz);
    let line = r#"{"id": "V9"}"#;
    let (rows, _) = flatten_lines(EntityKind::Venues, [line], &SkipSet::new());
    write_collection(&sink, SHARD, &rows)?;

    let (header, records) =
        read_csv_records(tmp.path().join("venues/2023-01-05_part_003.csv.gz"))?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0][0], "9");
    assert!(records[0][1..].iter().all(String::is_empty), "{header:?} {records:?}");

    let (_, ids) = read_csv_records(tmp.path().join("venues_ids/2023-01-05_part_003.csv.gz"))?;
    assert!(ids.is_empty());
    Ok(())
}
