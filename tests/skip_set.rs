use snapshot_flatten::testing::SnapshotFixture;
use snapshot_flatten::{EntityKind, load_skip_set};
use std::fs;

#[test]
fn missing_directory_means_empty_set() -> anyhow::Result<()> {
    let snap = SnapshotFixture::new()?;
    let skip = load_skip_set(snap.snapshot_root(), EntityKind::Works)?;
    assert!(skip.is_empty());
    Ok(())
}

#[test]
fn loads_ids_from_every_file() -> anyhow::Result<()> {
    let snap = SnapshotFixture::new()?;
    snap.add_merged_ids(EntityKind::Authors, "2023-01-01", &["A1", "A2"])?;
    snap.add_merged_ids(
        EntityKind::Authors,
        "2023-02-01",
        &["https://openalex.org/A3", "A2", "bogus", ""],
    )?;
    // other entities' files are not read
    snap.add_merged_ids(EntityKind::Works, "2023-01-01", &["W99"])?;

    let skip = load_skip_set(snap.snapshot_root(), EntityKind::Authors)?;
    assert_eq!(skip.len(), 3);
    assert!(skip.contains(1));
    assert!(skip.contains(2));
    assert!(skip.contains(3));
    assert!(!skip.contains(99));
    Ok(())
}

#[test]
fn file_without_id_column_is_an_error() -> anyhow::Result<()> {
    let snap = SnapshotFixture::new()?;
    let path = snap.add_merged_ids(EntityKind::Venues, "good", &["V1"])?;
    fs::write(path.with_file_name("bad.csv"), "merge_date,merge_into_id\n2023-01-01,V2\n")?;

    let err = load_skip_set(snap.snapshot_root(), EntityKind::Venues).unwrap_err();
    assert!(format!("{err:#}").contains("no `id` column"));
    Ok(())
}
