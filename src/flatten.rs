//! Flattening engine.
//!
//! A shard is a stream of JSON lines, one record per line. [`ShardFlattener`]
//! turns that stream into a [`RowCollection`] holding one table per output
//! kind of the entity. Per record it:
//!
//! 1. decodes the root `id`, dropping records with no usable id or whose id is
//!    in the [`SkipSet`];
//! 2. hands the record to the entity-specific flattener, which emits one row
//!    in the root table and fans nested collections out into child tables
//!    keyed on the root id.
//!
//! Record-level defects (a line that is not JSON, a missing id, a missing
//! nested field) never fail the shard. They are counted in [`FlattenStats`]
//! and the affected fields come out null. Only a stream that cannot be read at
//! all is an error.

mod authors;
mod concepts;
mod institutions;
mod venues;
mod works;

use crate::entity::EntityKind;
use crate::ids::decode_json_id;
use crate::io::jsonl::for_each_line;
use crate::row::RowCollection;
use crate::skip_set::SkipSet;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::path::Path;

/// Counters collected while flattening one shard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenStats {
    /// Non-blank lines seen.
    pub records_read: u64,
    /// Records that produced rows.
    pub records_written: u64,
    /// Records dropped because their id is in the skip-set.
    pub records_merged: u64,
    /// Records dropped because their id is absent or undecodable.
    pub records_without_id: u64,
    /// Lines that were not a JSON object.
    pub malformed_lines: u64,
}

impl FlattenStats {
    /// Fold another shard's counters into this one.
    pub fn merge(&mut self, other: &Self) {
        self.records_read += other.records_read;
        self.records_written += other.records_written;
        self.records_merged += other.records_merged;
        self.records_without_id += other.records_without_id;
        self.malformed_lines += other.malformed_lines;
    }
}

/// Accumulates the rows of one shard.
pub struct ShardFlattener<'a> {
    entity: EntityKind,
    skip: &'a SkipSet,
    rows: RowCollection,
    stats: FlattenStats,
}

impl<'a> ShardFlattener<'a> {
    #[must_use]
    pub fn new(entity: EntityKind, skip: &'a SkipSet) -> Self {
        Self {
            entity,
            skip,
            rows: RowCollection::new(entity.schemas()),
            stats: FlattenStats::default(),
        }
    }

    /// Parse one line and flatten it. Blank lines are ignored.
    pub fn push_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        self.stats.records_read += 1;
        match serde_json::from_str::<Json>(line) {
            Ok(Json::Object(record)) => self.flatten_object(&record),
            Ok(_) => {
                self.stats.malformed_lines += 1;
                tracing::debug!(entity = %self.entity, "skipping non-object line");
            }
            Err(e) => {
                self.stats.malformed_lines += 1;
                tracing::debug!(entity = %self.entity, error = %e, "skipping malformed line");
            }
        }
    }

    /// Flatten an already parsed record.
    pub fn push_record(&mut self, record: &Json) {
        self.stats.records_read += 1;
        match record.as_object() {
            Some(obj) => self.flatten_object(obj),
            None => self.stats.malformed_lines += 1,
        }
    }

    fn flatten_object(&mut self, record: &Map<String, Json>) {
        let Some(id) = decode_json_id(record.get("id")) else {
            self.stats.records_without_id += 1;
            tracing::trace!(entity = %self.entity, "record without decodable id");
            return;
        };
        if self.skip.contains(id) {
            self.stats.records_merged += 1;
            return;
        }
        let out = &mut self.rows;
        match self.entity {
            EntityKind::Works => works::flatten(id, record, out),
            EntityKind::Authors => authors::flatten(id, record, out),
            EntityKind::Institutions => institutions::flatten(id, record, out),
            EntityKind::Concepts => concepts::flatten(id, record, out),
            EntityKind::Venues => venues::flatten(id, record, out),
        }
        self.stats.records_written += 1;
    }

    #[must_use]
    pub const fn stats(&self) -> &FlattenStats {
        &self.stats
    }

    #[must_use]
    pub fn finish(self) -> (RowCollection, FlattenStats) {
        (self.rows, self.stats)
    }
}

/// Flatten an in-memory sequence of JSON lines.
#[must_use]
pub fn flatten_lines<'l>(
    entity: EntityKind,
    lines: impl IntoIterator<Item = &'l str>,
    skip: &SkipSet,
) -> (RowCollection, FlattenStats) {
    let mut flattener = ShardFlattener::new(entity, skip);
    for line in lines {
        flattener.push_line(line);
    }
    flattener.finish()
}

/// Decompress and flatten a shard file.
///
/// # Errors
/// Returns an error if the file cannot be opened, decompressed or read.
pub fn flatten_shard_file(
    path: impl AsRef<Path>,
    entity: EntityKind,
    skip: &SkipSet,
) -> Result<(RowCollection, FlattenStats)> {
    let mut flattener = ShardFlattener::new(entity, skip);
    for_each_line(path, |line| flattener.push_line(line))?;
    Ok(flattener.finish())
}

// ---------------------------------------------------------------------------
// helpers shared by the entity flatteners
// ---------------------------------------------------------------------------

/// Nested object under `key`, if it is one.
fn object<'a>(parent: &'a Map<String, Json>, key: &str) -> Option<&'a Map<String, Json>> {
    parent.get(key).and_then(Json::as_object)
}

/// Elements of the array under `key`; empty when absent or not an array.
fn array<'a>(parent: &'a Map<String, Json>, key: &str) -> &'a [Json] {
    parent
        .get(key)
        .and_then(Json::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Object elements of the array under `key`. Non-object elements are skipped.
fn objects<'a>(
    parent: &'a Map<String, Json>,
    key: &str,
) -> impl Iterator<Item = &'a Map<String, Json>> + 'a {
    array(parent, key).iter().filter_map(Json::as_object)
}

fn text<'a>(parent: &'a Map<String, Json>, key: &str) -> Option<&'a str> {
    parent.get(key).and_then(Json::as_str)
}

/// `display_name`, which every entity uses as its human-readable name.
fn display_name(parent: &Map<String, Json>) -> Option<&str> {
    text(parent, "display_name")
}
