#![cfg(all(feature = "compression-gzip", feature = "compression-zstd"))]

use serde_json::{Value, json};
use snapshot_flatten::io::compression::{
    auto_detect_writer, detect_from_extension, strip_compression_extension,
};
use snapshot_flatten::io::jsonl::{for_each_line, read_jsonl_vec, write_jsonl_vec};
use std::fs;
use std::io::Write;

#[test]
fn codecs_are_picked_by_extension() {
    assert_eq!(detect_from_extension("part_000.gz").map(|c| c.name()), Some("gzip"));
    assert_eq!(detect_from_extension("PART_000.GZ").map(|c| c.name()), Some("gzip"));
    assert_eq!(detect_from_extension("part_000.zst").map(|c| c.name()), Some("zstd"));
    assert!(detect_from_extension("part_000.json").is_none());
}

#[test]
fn compression_extension_is_stripped() {
    assert_eq!(strip_compression_extension("part_000.gz"), "part_000");
    assert_eq!(strip_compression_extension("part_000.zst"), "part_000");
    assert_eq!(strip_compression_extension("part_000"), "part_000");
    assert_eq!(strip_compression_extension(".gz"), "");
    assert_eq!(strip_compression_extension("ü"), "ü");
}

#[test]
fn jsonl_roundtrips_through_each_codec() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let records = vec![json!({"id": "W1"}), json!({"id": "W2", "title": "ü"})];
    for name in ["plain.jsonl", "nested/part.gz", "part.zst"] {
        let path = tmp.path().join(name);
        assert_eq!(write_jsonl_vec(&path, &records)?, 2);
        let back: Vec<Value> = read_jsonl_vec(&path)?;
        assert_eq!(back, records, "{name}");
    }
    Ok(())
}

#[test]
fn gzip_is_detected_by_content_without_extension() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let gz = tmp.path().join("part_000.gz");
    write_jsonl_vec(&gz, &[json!({"id": "W1"})])?;
    let renamed = tmp.path().join("part_000");
    fs::rename(&gz, &renamed)?;

    let mut lines = Vec::new();
    for_each_line(&renamed, |l| lines.push(l.to_string()))?;
    assert_eq!(lines, vec![r#"{"id":"W1"}"#.to_string()]);
    Ok(())
}

#[test]
fn for_each_line_strips_terminators_and_keeps_bad_bytes() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("mixed.gz");
    let mut w = auto_detect_writer(fs::File::create(&path)?, &path)?;
    w.write_all(b"first\r\n\nsecond \xff\nlast")?;
    w.finish()?;

    let mut lines = Vec::new();
    let n = for_each_line(&path, |l| lines.push(l.to_string()))?;
    assert_eq!(n, 4);
    assert_eq!(lines, vec!["first", "", "second \u{fffd}", "last"]);
    Ok(())
}

#[test]
fn concatenated_gzip_members_are_read_fully() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let a = tmp.path().join("a.gz");
    let b = tmp.path().join("b.gz");
    write_jsonl_vec(&a, &[json!(1)])?;
    write_jsonl_vec(&b, &[json!(2)])?;
    let mut joined = fs::read(&a)?;
    joined.extend(fs::read(&b)?);
    let path = tmp.path().join("joined.gz");
    fs::write(&path, joined)?;

    let back: Vec<Value> = read_jsonl_vec(&path)?;
    assert_eq!(back, vec![json!(1), json!(2)]);
    Ok(())
}

#[test]
fn truncated_gzip_is_an_error() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("cut.gz");
    let records: Vec<Value> = (0..500).map(|i| json!({"id": format!("W{i}"), "pad": "x".repeat(50)})).collect();
    write_jsonl_vec(&path, &records)?;
    let bytes = fs::read(&path)?;
    fs::write(&path, &bytes[..bytes.len() / 2])?;

    assert!(for_each_line(&path, |_| {}).is_err());
    Ok(())
}
