//! Artifact archive extraction
//!
//! CI artifact downloads arrive as ZIP archives wrapping a single build output
//! (an APK, an AAB, a zipped xcarchive). This module pulls that one file out of
//! the in-memory archive without an archive library: the central directory is
//! parsed by hand and only the raw-deflate codec comes from `flate2`.
//!
//! Archives written in streaming mode record zero sizes in their local headers,
//! so sizes are always taken from the central directory.

mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use zip::{extract_first_entry, list_entries};

use crate::error::ArchiveError;

/// Compression method of an archive entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Method 0, bytes stored as-is
    Stored,
    /// Method 8, raw deflate
    Deflated,
    /// Anything else; the entry's bytes are passed through undecoded
    Other(u16),
}

impl From<u16> for CompressionMethod {
    fn from(method: u16) -> Self {
        match method {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflated,
            other => CompressionMethod::Other(other),
        }
    }
}

/// Central directory record for one entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryHeader {
    /// Entry path inside the archive
    pub name: String,
    /// Compression method
    pub method: CompressionMethod,
    /// Size of the stored data
    pub compressed_size: u32,
    /// Size after decompression
    pub uncompressed_size: u32,
    /// Offset of the entry's local file header
    pub local_header_offset: u32,
}

impl EntryHeader {
    /// Directory markers end in `/` or have no content at all
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/') || (self.compressed_size == 0 && self.uncompressed_size == 0)
    }
}

/// A file pulled out of an archive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry path inside the archive
    pub name: String,
    /// How the entry was stored
    pub method: CompressionMethod,
    /// Size of the stored data, from the central directory
    pub compressed_size: u32,
    /// Declared size after decompression, from the central directory
    pub uncompressed_size: u32,
    /// Decompressed bytes (or the stored bytes for unsupported methods)
    pub data: Vec<u8>,
}

/// Result of looking for the first file in an archive
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extraction {
    /// The first non-directory entry
    Found(ArchiveEntry),
    /// No entry could be extracted, with the reason
    NotFound(ArchiveError),
}
