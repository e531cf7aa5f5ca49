use crate::error::ArchiveError;
use flate2::read::DeflateDecoder;
use std::io::Read;
use tracing::{debug, warn};

use super::{ArchiveEntry, CompressionMethod, EntryHeader, Extraction};

const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;

/// Fixed part of the end-of-central-directory record
const EOCD_LEN: usize = 22;
/// Largest comment that may follow the EOCD record
const MAX_COMMENT_LEN: usize = u16::MAX as usize;
/// Fixed part of a central directory file header
const CENTRAL_HEADER_LEN: usize = 46;
/// Fixed part of a local file header
const LOCAL_HEADER_LEN: usize = 30;

fn read_u16(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Scan backward for the EOCD signature, starting at the last position a
/// 22-byte record fits and stopping once a maximum-length comment is exhausted.
fn find_eocd(buf: &[u8]) -> Option<usize> {
    let last = buf.len().checked_sub(EOCD_LEN)?;
    let floor = buf.len().saturating_sub(EOCD_LEN + MAX_COMMENT_LEN);
    (floor..=last)
        .rev()
        .find(|&offset| read_u32(buf, offset) == Some(EOCD_SIGNATURE))
}

/// Returns the central directory offset and the total entry count
fn locate_central_directory(buf: &[u8]) -> Result<(usize, u16), ArchiveError> {
    if buf.len() < EOCD_LEN {
        return Err(ArchiveError::ArchiveTooSmall);
    }

    let eocd = find_eocd(buf).ok_or(ArchiveError::NoCentralDirectory)?;
    let total_entries = read_u16(buf, eocd + 10).ok_or(ArchiveError::NoCentralDirectory)?;
    let offset = read_u32(buf, eocd + 16).ok_or(ArchiveError::NoCentralDirectory)?;

    if total_entries == 0 {
        return Err(ArchiveError::EmptyArchive);
    }

    Ok((offset as usize, total_entries))
}

/// Parse the central directory record at `offset`, returning it with the
/// offset of the next record
fn read_central_record(buf: &[u8], offset: usize) -> Result<(EntryHeader, usize), ArchiveError> {
    let corrupt = ArchiveError::CorruptCentralDirectory;

    let name_start = offset.checked_add(CENTRAL_HEADER_LEN).ok_or(corrupt)?;
    if name_start > buf.len() || read_u32(buf, offset) != Some(CENTRAL_HEADER_SIGNATURE) {
        return Err(corrupt);
    }

    let method = read_u16(buf, offset + 10).ok_or(corrupt)?;
    let compressed_size = read_u32(buf, offset + 20).ok_or(corrupt)?;
    let uncompressed_size = read_u32(buf, offset + 24).ok_or(corrupt)?;
    let name_len = read_u16(buf, offset + 28).ok_or(corrupt)? as usize;
    let extra_len = read_u16(buf, offset + 30).ok_or(corrupt)? as usize;
    let comment_len = read_u16(buf, offset + 32).ok_or(corrupt)? as usize;
    let local_header_offset = read_u32(buf, offset + 42).ok_or(corrupt)?;

    let name_bytes = buf.get(name_start..name_start + name_len).ok_or(corrupt)?;
    let name = String::from_utf8_lossy(name_bytes).into_owned();

    let next = name_start + name_len + extra_len + comment_len;

    Ok((
        EntryHeader {
            name,
            method: CompressionMethod::from(method),
            compressed_size,
            uncompressed_size,
            local_header_offset,
        },
        next,
    ))
}

/// List every entry recorded in the central directory
pub fn list_entries(buf: &[u8]) -> Result<Vec<EntryHeader>, ArchiveError> {
    let (mut cursor, total) = locate_central_directory(buf)?;
    let mut entries = Vec::with_capacity(total as usize);

    for _ in 0..total {
        let (header, next) = read_central_record(buf, cursor)?;
        entries.push(header);
        cursor = next;
    }

    Ok(entries)
}

fn first_file_entry(buf: &[u8]) -> Result<EntryHeader, ArchiveError> {
    let (mut cursor, total) = locate_central_directory(buf)?;

    for _ in 0..total {
        let (header, next) = read_central_record(buf, cursor)?;
        if !header.is_directory() {
            return Ok(header);
        }
        debug!(name = %header.name, "skipping directory entry");
        cursor = next;
    }

    Err(ArchiveError::NoFileEntries)
}

/// Slice the entry's data using the local header's own name/extra lengths,
/// which may differ from the central record's.
fn entry_data<'a>(buf: &'a [u8], header: &EntryHeader) -> Result<&'a [u8], ArchiveError> {
    let local = header.local_header_offset as usize;

    match read_u32(buf, local) {
        Some(LOCAL_HEADER_SIGNATURE) => {}
        Some(_) => return Err(ArchiveError::CorruptLocalHeader),
        None => return Err(ArchiveError::Truncated),
    }

    let name_len = read_u16(buf, local + 26).ok_or(ArchiveError::Truncated)? as usize;
    let extra_len = read_u16(buf, local + 28).ok_or(ArchiveError::Truncated)? as usize;

    let start = local + LOCAL_HEADER_LEN + name_len + extra_len;
    let end = start
        .checked_add(header.compressed_size as usize)
        .ok_or(ArchiveError::Truncated)?;

    buf.get(start..end).ok_or(ArchiveError::Truncated)
}

fn decompress(header: &EntryHeader, raw: &[u8]) -> Vec<u8> {
    match header.method {
        CompressionMethod::Stored => raw.to_vec(),
        CompressionMethod::Deflated => {
            let mut out = Vec::new();
            match DeflateDecoder::new(raw).read_to_end(&mut out) {
                Ok(_) => out,
                Err(e) => {
                    warn!(
                        name = %header.name,
                        error = %e,
                        "inflate failed, keeping compressed bytes"
                    );
                    raw.to_vec()
                }
            }
        }
        // Lenient: unknown methods are passed through rather than rejected
        CompressionMethod::Other(method) => {
            warn!(
                name = %header.name,
                method,
                "unsupported compression method, keeping compressed bytes"
            );
            raw.to_vec()
        }
    }
}

/// Extract the first non-directory entry of a ZIP archive held in memory
///
/// Only the first file is returned; further entries are ignored. Malformed,
/// empty and directory-only archives produce [`Extraction::NotFound`] with the
/// reason, never a panic or an error.
///
/// # Example
///
/// ```
/// use storefront2app::extraction::{Extraction, extract_first_entry};
///
/// match extract_first_entry(b"definitely not a zip archive") {
///     Extraction::Found(entry) => println!("{} ({} bytes)", entry.name, entry.data.len()),
///     Extraction::NotFound(reason) => println!("nothing extracted: {reason}"),
/// }
/// ```
pub fn extract_first_entry(buf: &[u8]) -> Extraction {
    let result = first_file_entry(buf).and_then(|header| {
        let raw = entry_data(buf, &header)?;
        let data = decompress(&header, raw);
        Ok(ArchiveEntry {
            name: header.name,
            method: header.method,
            compressed_size: header.compressed_size,
            uncompressed_size: header.uncompressed_size,
            data,
        })
    });

    match result {
        Ok(entry) => {
            debug!(name = %entry.name, size = entry.data.len(), "extracted archive entry");
            Extraction::Found(entry)
        }
        Err(reason) => {
            debug!(%reason, archive_size = buf.len(), "no archive entry extracted");
            Extraction::NotFound(reason)
        }
    }
}
