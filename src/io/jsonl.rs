//! JSON Lines shard I/O.
//!
//! - **Streaming read**: [`for_each_line`] decompresses a shard and hands
//!   every line to a callback without holding the whole file in memory.
//! - **Typed read/write**: [`read_jsonl_vec`] and [`write_jsonl_vec`], used by
//!   fixtures and small side files.
//!
//! # Notes
//! - Lines that are not valid UTF-8 are passed on lossily converted, so a bad
//!   byte sequence becomes a malformed record rather than a failed shard.
//! - A decompression or read error is returned as an error: the stream is
//!   unusable past that point.

use crate::io::compression::{auto_detect_reader, auto_detect_writer};
use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{File, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Call `f` with every line of a (possibly compressed) JSONL file.
///
/// Line terminators are stripped. Blank lines are passed through; callers
/// decide whether to skip them.
///
/// # Returns
/// The number of lines read.
///
/// # Errors
/// Returns an error if the file cannot be opened, decompressed or read.
pub fn for_each_line(path: impl AsRef<Path>, mut f: impl FnMut(&str)) -> Result<u64> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rdr = auto_detect_reader(file, path)
        .with_context(|| format!("setup decompression for {}", path.display()))?;
    let mut rdr = BufReader::new(rdr);

    let mut buf = Vec::with_capacity(8 * 1024);
    let mut lines = 0u64;
    loop {
        buf.clear();
        let n = rdr
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("read line {} in {}", lines + 1, path.display()))?;
        if n == 0 {
            break;
        }
        lines += 1;
        let line = String::from_utf8_lossy(&buf);
        f(line.trim_end_matches(['\n', '\r']));
    }
    Ok(lines)
}

/// Read a JSONL file into a typed `Vec<T>`, skipping blank lines.
///
/// # Errors
/// Returns an error if the file cannot be read or a line fails to parse into `T`.
pub fn read_jsonl_vec<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rdr = auto_detect_reader(f, path)
        .with_context(|| format!("setup decompression for {}", path.display()))?;
    let rdr = BufReader::new(rdr);
    let mut out = Vec::<T>::new();
    for (i, line) in rdr.lines().enumerate() {
        let line = line.with_context(|| format!("read line {} in {}", i + 1, path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let v: T = serde_json::from_str(&line)
            .with_context(|| format!("parse JSONL line {} in {}", i + 1, path.display()))?;
        out.push(v);
    }
    Ok(out)
}

/// Write a slice as JSONL, compressing by extension. Parent directories are
/// created as needed.
///
/// # Returns
/// The number of items written.
///
/// # Errors
/// Returns an error if the file cannot be created or an item fails to serialize.
pub fn write_jsonl_vec<T: Serialize>(path: impl AsRef<Path>, data: &[T]) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = auto_detect_writer(f, path)
        .with_context(|| format!("setup compression for {}", path.display()))?;
    for (i, item) in data.iter().enumerate() {
        serde_json::to_writer(&mut w, item)
            .with_context(|| format!("serialize item #{} to {}", i, path.display()))?;
        w.write_all(b"\n")?;
    }
    w.finish()
        .with_context(|| format!("finish {}", path.display()))?;
    Ok(data.len())
}
