//! File I/O: compressed JSON Lines input, CSV and Parquet output.
//!
//! Compression is picked from the file extension (see [`compression`]), so
//! the same readers handle `.gz` shards and plain test fixtures.

pub mod compression;
pub mod csv;
pub mod jsonl;

#[cfg_attr(docsrs, doc(cfg(feature = "io-parquet")))]
#[cfg(feature = "io-parquet")]
pub mod parquet;
