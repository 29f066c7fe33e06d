//! Transparent compression for shard reads and output writes.
//!
//! Codecs are selected by file extension first and, for reads, by magic bytes
//! when the extension is not recognised. A path with neither is treated as
//! plain text.
//!
//! ## Built-in codecs
//! - **Gzip** (`.gz`) via `flate2` (feature: `compression-gzip`). Multi-member
//!   streams are read to the end.
//! - **Zstd** (`.zst`) via `zstd` (feature: `compression-zstd`).
//!
//! Writers come back as [`FinishWrite`] so that the compressed trailer is
//! written explicitly and any error while doing so reaches the caller instead
//! of being swallowed on drop.
//!
//! ```no_run
//! use snapshot_flatten::io::compression::{auto_detect_reader, auto_detect_writer};
//! use std::fs::File;
//! use std::io::Write;
//! # fn main() -> anyhow::Result<()> {
//! let reader = auto_detect_reader(File::open("part_000.gz")?, "part_000.gz")?;
//!
//! let mut writer = auto_detect_writer(File::create("table.csv.gz")?, "table.csv.gz")?;
//! writer.write_all(b"id\n1\n")?;
//! writer.finish()?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::OnceLock;

/// A writer that must be explicitly finished.
pub trait FinishWrite: Write {
    /// Flush buffered data, write any trailer and flush the underlying sink.
    ///
    /// # Errors
    /// Returns any I/O error raised while finishing the stream.
    fn finish(self: Box<Self>) -> std::io::Result<()>;
}

impl<W: Write> FinishWrite for BufWriter<W> {
    fn finish(mut self: Box<Self>) -> std::io::Result<()> {
        self.flush()
    }
}

/// A compression algorithm.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g. "gzip").
    fn name(&self) -> &str;

    /// Lowercase file extensions with the leading dot.
    fn extensions(&self) -> &[&str];

    /// Signature at the start of a compressed stream, if the format has one.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Wrap a reader with decompression.
    ///
    /// # Errors
    /// Returns an error if the decoder cannot be constructed.
    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>>;

    /// Wrap a writer with compression.
    ///
    /// # Errors
    /// Returns an error if the encoder cannot be constructed.
    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn FinishWrite>>;
}

fn registry() -> &'static [Box<dyn CompressionCodec>] {
    static CODECS: OnceLock<Vec<Box<dyn CompressionCodec>>> = OnceLock::new();
    CODECS.get_or_init(|| {
        vec![
            #[cfg(feature = "compression-gzip")]
            Box::new(GzipCodec),
            #[cfg(feature = "compression-zstd")]
            Box::new(ZstdCodec),
        ]
    })
}

/// Codec whose extension ends the path, if any. Case-insensitive.
pub fn detect_from_extension(path: impl AsRef<Path>) -> Option<&'static dyn CompressionCodec> {
    let path_str = path.as_ref().to_string_lossy().to_lowercase();
    registry()
        .iter()
        .find(|codec| codec.extensions().iter().any(|ext| path_str.ends_with(ext)))
        .map(AsRef::as_ref)
}

/// Codec whose signature starts the buffered stream. The reader is not advanced.
fn detect_from_magic<R: BufRead>(reader: &mut R) -> Option<&'static dyn CompressionCodec> {
    let buf = reader.fill_buf().ok()?;
    if buf.is_empty() {
        return None;
    }
    registry()
        .iter()
        .find(|codec| codec.magic_bytes().is_some_and(|magic| buf.starts_with(magic)))
        .map(AsRef::as_ref)
}

/// Strip a recognised compression extension from a file name.
///
/// `part_000.gz` → `part_000`; names without one are returned unchanged.
#[must_use]
pub fn strip_compression_extension(name: &str) -> &str {
    for codec in registry() {
        for ext in codec.extensions() {
            let Some(split) = name.len().checked_sub(ext.len()) else {
                continue;
            };
            if name.is_char_boundary(split) && name[split..].eq_ignore_ascii_case(ext) {
                return &name[..split];
            }
        }
    }
    name
}

/// Wrap a reader with decompression when the path or the content calls for it.
///
/// # Errors
/// Returns an error if the detected codec cannot build its decoder.
pub fn auto_detect_reader<R: Read + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn Read>> {
    if let Some(codec) = detect_from_extension(&path_hint) {
        return codec
            .wrap_reader_dyn(Box::new(reader))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }

    let mut buf_reader = BufReader::new(reader);
    if let Some(codec) = detect_from_magic(&mut buf_reader) {
        return codec
            .wrap_reader_dyn(Box::new(buf_reader))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }

    Ok(Box::new(buf_reader))
}

/// Wrap a writer with compression chosen by the path extension.
///
/// # Errors
/// Returns an error if the detected codec cannot build its encoder.
pub fn auto_detect_writer<W: Write + 'static>(
    writer: W,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn FinishWrite>> {
    if let Some(codec) = detect_from_extension(&path_hint) {
        return codec
            .wrap_writer_dyn(Box::new(BufWriter::new(writer)))
            .with_context(|| format!("wrap writer with {} codec", codec.name()));
    }
    Ok(Box::new(BufWriter::new(writer)))
}

// ============================================================================
// Built-in codecs
// ============================================================================

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl FinishWrite for flate2::write::GzEncoder<Box<dyn Write>> {
    fn finish(self: Box<Self>) -> std::io::Result<()> {
        let mut inner = (*self).finish()?;
        inner.flush()
    }
}

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        Ok(Box::new(flate2::read::MultiGzDecoder::new(reader)))
    }

    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn FinishWrite>> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        Ok(Box::new(GzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl FinishWrite for zstd::stream::write::Encoder<'static, Box<dyn Write>> {
    fn finish(self: Box<Self>) -> std::io::Result<()> {
        let mut inner = (*self).finish()?;
        inner.flush()
    }
}

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read>)
    }

    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn FinishWrite>> {
        zstd::stream::write::Encoder::new(writer, 3).map(|e| Box::new(e) as Box<dyn FinishWrite>)
    }
}
