use crate::error::ArchiveError;
use crate::extraction::*;
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::{Cursor, Write};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build an archive with the zip crate, the way CI artifact bundles are produced
fn zip_with(files: &[(&str, &[u8])], method: ::zip::CompressionMethod) -> Vec<u8> {
    let mut writer = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = ::zip::write::FileOptions::default().compression_method(method);
    for (name, content) in files {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// One hand-built entry; `local_sizes_zeroed` mimics streaming writers that
/// only know the sizes after the data and put them in a trailing descriptor.
struct RawEntry<'a> {
    name: &'a str,
    method: u16,
    payload: Vec<u8>,
    uncompressed_size: u32,
    crc: u32,
    local_sizes_zeroed: bool,
    local_extra: Vec<u8>,
}

impl<'a> RawEntry<'a> {
    fn stored(name: &'a str, data: &[u8]) -> Self {
        Self {
            name,
            method: 0,
            payload: data.to_vec(),
            uncompressed_size: data.len() as u32,
            crc: crc_of(data),
            local_sizes_zeroed: false,
            local_extra: Vec::new(),
        }
    }

    fn deflated(name: &'a str, data: &[u8]) -> Self {
        Self {
            name,
            method: 8,
            payload: deflate(data),
            uncompressed_size: data.len() as u32,
            crc: crc_of(data),
            local_sizes_zeroed: false,
            local_extra: Vec::new(),
        }
    }
}

fn crc_of(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

fn build_raw_archive(entries: &[RawEntry<'_>], comment: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut central = Vec::new();

    for entry in entries {
        let local_offset = out.len() as u32;
        let compressed_size = entry.payload.len() as u32;
        let flags: u16 = if entry.local_sizes_zeroed { 0x0008 } else { 0 };
        let (local_crc, local_csize, local_usize) = if entry.local_sizes_zeroed {
            (0, 0, 0)
        } else {
            (entry.crc, compressed_size, entry.uncompressed_size)
        };

        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&entry.method.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]); // mod time + date
        out.extend_from_slice(&local_crc.to_le_bytes());
        out.extend_from_slice(&local_csize.to_le_bytes());
        out.extend_from_slice(&local_usize.to_le_bytes());
        out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(entry.local_extra.len() as u16).to_le_bytes());
        out.extend_from_slice(entry.name.as_bytes());
        out.extend_from_slice(&entry.local_extra);
        out.extend_from_slice(&entry.payload);

        if entry.local_sizes_zeroed {
            out.extend_from_slice(&0x0807_4b50u32.to_le_bytes());
            out.extend_from_slice(&entry.crc.to_le_bytes());
            out.extend_from_slice(&compressed_size.to_le_bytes());
            out.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
        }

        central.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes()); // made by
        central.extend_from_slice(&20u16.to_le_bytes()); // needed
        central.extend_from_slice(&flags.to_le_bytes());
        central.extend_from_slice(&entry.method.to_le_bytes());
        central.extend_from_slice(&[0u8; 4]);
        central.extend_from_slice(&entry.crc.to_le_bytes());
        central.extend_from_slice(&compressed_size.to_le_bytes());
        central.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
        central.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes()); // extra
        central.extend_from_slice(&0u16.to_le_bytes()); // comment
        central.extend_from_slice(&0u16.to_le_bytes()); // disk
        central.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        central.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        central.extend_from_slice(&local_offset.to_le_bytes());
        central.extend_from_slice(entry.name.as_bytes());
    }

    let central_offset = out.len() as u32;
    let central_size = central.len() as u32;
    out.extend_from_slice(&central);

    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&central_size.to_le_bytes());
    out.extend_from_slice(&central_offset.to_le_bytes());
    out.extend_from_slice(&(comment.len() as u16).to_le_bytes());
    out.extend_from_slice(comment);
    out
}

fn expect_found(archive: &[u8]) -> ArchiveEntry {
    match extract_first_entry(archive) {
        Extraction::Found(entry) => entry,
        Extraction::NotFound(reason) => panic!("expected an entry, got NotFound({reason:?})"),
    }
}

fn expect_not_found(archive: &[u8]) -> ArchiveError {
    match extract_first_entry(archive) {
        Extraction::Found(entry) => panic!("expected NotFound, got entry {}", entry.name),
        Extraction::NotFound(reason) => reason,
    }
}

/// Position of the EOCD record in an archive without a trailing comment
fn eocd_offset(archive: &[u8]) -> usize {
    archive.len() - 22
}

// ---------------------------------------------------------------------------
// Successful extraction
// ---------------------------------------------------------------------------

#[test]
fn deflated_entry_round_trips() {
    let content: Vec<u8> = b"classes.dex resources.arsc AndroidManifest.xml "
        .iter()
        .copied()
        .cycle()
        .take(64 * 1024)
        .collect();
    let archive = zip_with(&[("app-release.apk", &content)], ::zip::CompressionMethod::Deflated);

    let entry = expect_found(&archive);

    assert_eq!(entry.name, "app-release.apk");
    assert_eq!(entry.method, CompressionMethod::Deflated);
    assert_eq!(entry.data, content);
    assert_eq!(entry.uncompressed_size as usize, content.len());
    assert!(entry.compressed_size < entry.uncompressed_size);
}

#[test]
fn stored_entry_is_returned_verbatim() {
    let content = b"PK-looking payload \x50\x4b\x05\x06 inside a stored entry";
    let archive = zip_with(&[("app-debug.apk", content)], ::zip::CompressionMethod::Stored);

    let entry = expect_found(&archive);

    assert_eq!(entry.name, "app-debug.apk");
    assert_eq!(entry.method, CompressionMethod::Stored);
    assert_eq!(entry.data, content);
}

#[test]
fn streamed_entry_uses_central_directory_sizes() {
    let content = b"streaming writers leave the local header sizes at zero".repeat(50);
    let mut entry = RawEntry::deflated("app-release.aab", &content);
    entry.local_sizes_zeroed = true;
    let archive = build_raw_archive(&[entry], b"");

    let extracted = expect_found(&archive);

    assert_eq!(extracted.name, "app-release.aab");
    assert_eq!(extracted.data, content);
}

#[test]
fn local_extra_field_shifts_data_start() {
    let content = b"local header carries an extra field the central record lacks";
    let mut entry = RawEntry::stored("build/app.apk", content);
    entry.local_extra = vec![0xca, 0xfe, 0x04, 0x00, 1, 2, 3, 4];
    let archive = build_raw_archive(&[entry], b"");

    assert_eq!(expect_found(&archive).data, content);
}

#[test]
fn leading_directories_are_skipped() {
    let archive = zip_with(
        &[
            ("outputs/", b""),
            ("outputs/apk/", b""),
            ("outputs/apk/app-debug.apk", b"apk bytes"),
        ],
        ::zip::CompressionMethod::Deflated,
    );

    let entry = expect_found(&archive);

    assert_eq!(entry.name, "outputs/apk/app-debug.apk");
    assert_eq!(entry.data, b"apk bytes");
}

#[test]
fn only_first_file_is_returned() {
    let archive = zip_with(
        &[("first.apk", b"first"), ("second.apk", b"second")],
        ::zip::CompressionMethod::Deflated,
    );

    let entry = expect_found(&archive);

    assert_eq!(entry.name, "first.apk");
    assert_eq!(entry.data, b"first");
}

#[test]
fn archive_comment_does_not_hide_trailer() {
    let comment = vec![b'c'; 4000];
    let archive = build_raw_archive(&[RawEntry::stored("app.apk", b"payload")], &comment);

    assert_eq!(expect_found(&archive).data, b"payload");
}

#[test]
fn unknown_method_passes_bytes_through() {
    let mut entry = RawEntry::stored("app.apk", b"lzma-ish bytes");
    entry.method = 14;
    let archive = build_raw_archive(&[entry], b"");

    let extracted = expect_found(&archive);

    assert_eq!(extracted.method, CompressionMethod::Other(14));
    assert_eq!(extracted.data, b"lzma-ish bytes");
}

#[test]
fn broken_deflate_stream_returns_compressed_bytes() {
    let garbage = vec![0xff; 32];
    let entry = RawEntry {
        name: "app.apk",
        method: 8,
        payload: garbage.clone(),
        uncompressed_size: 100,
        crc: 0,
        local_sizes_zeroed: false,
        local_extra: Vec::new(),
    };
    let archive = build_raw_archive(&[entry], b"");

    assert_eq!(expect_found(&archive).data, garbage);
}

// ---------------------------------------------------------------------------
// NotFound outcomes
// ---------------------------------------------------------------------------

#[test]
fn tiny_buffer_is_too_small() {
    assert_eq!(expect_not_found(b""), ArchiveError::ArchiveTooSmall);
    assert_eq!(expect_not_found(&[0x50, 0x4b, 0x05, 0x06]), ArchiveError::ArchiveTooSmall);
}

#[test]
fn missing_trailer_is_reported() {
    let not_a_zip = vec![0u8; 4096];
    assert_eq!(expect_not_found(&not_a_zip), ArchiveError::NoCentralDirectory);
}

#[test]
fn trailer_beyond_comment_window_is_not_found() {
    let mut archive = build_raw_archive(&[RawEntry::stored("app.apk", b"payload")], b"");
    // Push the EOCD out of reach: more trailing bytes than any comment may hold
    archive.extend(std::iter::repeat_n(0u8, 70_000));

    assert_eq!(expect_not_found(&archive), ArchiveError::NoCentralDirectory);
}

#[test]
fn zero_entry_archive_is_empty() {
    let archive = build_raw_archive(&[], b"");
    assert_eq!(archive.len(), 22);
    assert_eq!(expect_not_found(&archive), ArchiveError::EmptyArchive);
}

#[test]
fn directory_only_archive_has_no_file_entries() {
    let archive = zip_with(
        &[("build/", b""), ("build/outputs/", b"")],
        ::zip::CompressionMethod::Stored,
    );
    assert_eq!(expect_not_found(&archive), ArchiveError::NoFileEntries);
}

#[test]
fn bad_central_directory_offset_is_corrupt() {
    let mut archive = build_raw_archive(&[RawEntry::stored("app.apk", b"payload")], b"");
    let eocd = eocd_offset(&archive);
    archive[eocd + 16..eocd + 20].copy_from_slice(&u32::MAX.to_le_bytes());

    assert_eq!(expect_not_found(&archive), ArchiveError::CorruptCentralDirectory);
}

#[test]
fn wrong_central_signature_is_corrupt() {
    let mut archive = build_raw_archive(&[RawEntry::stored("app.apk", b"payload")], b"");
    let eocd = eocd_offset(&archive);
    let central = u32::from_le_bytes(archive[eocd + 16..eocd + 20].try_into().unwrap()) as usize;
    archive[central] = 0;

    assert_eq!(expect_not_found(&archive), ArchiveError::CorruptCentralDirectory);
}

#[test]
fn overstated_entry_count_is_corrupt() {
    let mut archive = build_raw_archive(&[RawEntry::stored("dir/", b"")], b"");
    let eocd = eocd_offset(&archive);
    archive[eocd + 10..eocd + 12].copy_from_slice(&5u16.to_le_bytes());

    assert_eq!(expect_not_found(&archive), ArchiveError::CorruptCentralDirectory);
}

#[test]
fn wrong_local_signature_is_reported() {
    let mut archive = build_raw_archive(&[RawEntry::stored("app.apk", b"payload")], b"");
    archive[0] = 0;

    assert_eq!(expect_not_found(&archive), ArchiveError::CorruptLocalHeader);
}

#[test]
fn overstated_compressed_size_is_truncated() {
    let mut entry = RawEntry::stored("app.apk", b"payload");
    entry.uncompressed_size = 1_000_000;
    let mut archive = build_raw_archive(&[entry], b"");

    // Central record compressed size lives 20 bytes into the record
    let eocd = eocd_offset(&archive);
    let central = u32::from_le_bytes(archive[eocd + 16..eocd + 20].try_into().unwrap()) as usize;
    archive[central + 20..central + 24].copy_from_slice(&1_000_000u32.to_le_bytes());

    assert_eq!(expect_not_found(&archive), ArchiveError::Truncated);
}

#[test]
fn local_offset_past_end_is_truncated() {
    let mut archive = build_raw_archive(&[RawEntry::stored("app.apk", b"payload")], b"");
    let eocd = eocd_offset(&archive);
    let central = u32::from_le_bytes(archive[eocd + 16..eocd + 20].try_into().unwrap()) as usize;
    archive[central + 42..central + 46].copy_from_slice(&0x00ff_ffffu32.to_le_bytes());

    assert_eq!(expect_not_found(&archive), ArchiveError::Truncated);
}

#[test]
fn arbitrary_bytes_never_panic() {
    // Deterministic pseudo-random buffers sprinkled with signatures
    let mut state: u32 = 0x1234_5678;
    for len in [22usize, 23, 64, 100, 512, 4096] {
        let mut buf: Vec<u8> = (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as u8
            })
            .collect();
        buf[len - 22..len - 18].copy_from_slice(&0x0605_4b50u32.to_le_bytes());
        if len > 60 {
            buf[0..4].copy_from_slice(&0x0201_4b50u32.to_le_bytes());
        }
        let _ = extract_first_entry(&buf);
        let _ = list_entries(&buf);
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[test]
fn list_entries_reports_every_record() {
    let archive = zip_with(
        &[
            ("outputs/", b""),
            ("outputs/app-release.apk", b"release"),
            ("outputs/mapping.txt", b"mapping"),
        ],
        ::zip::CompressionMethod::Stored,
    );

    let entries = list_entries(&archive).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();

    assert_eq!(
        names,
        ["outputs/", "outputs/app-release.apk", "outputs/mapping.txt"]
    );
    assert!(entries[0].is_directory());
    assert!(!entries[1].is_directory());
    assert_eq!(entries[1].uncompressed_size, 7);
    assert_eq!(entries[1].method, CompressionMethod::Stored);
}

#[test]
fn list_entries_propagates_structural_errors() {
    assert_eq!(list_entries(b"short"), Err(ArchiveError::ArchiveTooSmall));
    assert_eq!(
        list_entries(&build_raw_archive(&[], b"")),
        Err(ArchiveError::EmptyArchive)
    );
}

#[test]
fn first_entry_of_single_file_archive() {
    let archive = zip_with(&[("a.apk", b"a")], ::zip::CompressionMethod::Stored);

    match extract_first_entry(&archive) {
        Extraction::Found(entry) => assert_eq!(entry.data, b"a".to_vec()),
        other => panic!("expected an entry, got {other:?}"),
    }
    assert!(matches!(extract_first_entry(b""), Extraction::NotFound(_)));
}
