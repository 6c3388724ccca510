//! Partial-content prefilter.
//!
//! # Overview
//!
//! Within a size bucket, files whose first or last `W` bytes differ cannot be
//! identical. This stage reads those two windows from every candidate and
//! subdivides each bucket by the result. A file no larger than `2W` is read
//! exactly once, whole, and keyed by that single read.
//!
//! The key is a BLAKE3 fingerprint of each window rather than the raw bytes,
//! so memory stays proportional to the number of files. Matching keys are
//! necessary but not sufficient for equality: files that differ only in the
//! unread middle survive this stage and are separated by hashing or byte
//! verification.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::duplicates::hashing::{Candidate, HashEngine};
use crate::scanner::{FileError, FileRecord};

/// Default window size for the prefix and suffix reads (1 MiB).
pub const DEFAULT_PARTIAL_WINDOW: u64 = 1024 * 1024;

/// Fingerprint of the bytes a file holds in its prefix and suffix windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialKey {
    prefix: [u8; 32],
    suffix: Option<[u8; 32]>,
}

impl PartialKey {
    /// Fingerprint of the first window, or of the whole file when it fits
    /// in two windows.
    #[must_use]
    pub fn prefix(&self) -> &[u8; 32] {
        &self.prefix
    }

    /// Fingerprint of the last window, absent for files no larger than `2W`.
    #[must_use]
    pub fn suffix(&self) -> Option<&[u8; 32]> {
        self.suffix.as_ref()
    }

    /// True when the key covers the entire file content.
    #[must_use]
    pub fn is_whole_file(&self) -> bool {
        self.suffix.is_none()
    }
}

/// Fingerprint exactly `len` bytes from the current position of `reader`.
fn fingerprint<R: Read>(reader: &mut R, len: u64) -> io::Result<[u8; 32]> {
    let mut hasher = blake3::Hasher::new();
    let copied = io::copy(&mut reader.take(len), &mut hasher)?;
    if copied != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("file shrank while reading: expected {len} bytes, got {copied}"),
        ));
    }
    Ok(*hasher.finalize().as_bytes())
}

/// Read the partial key of a file of `size` bytes.
///
/// # Errors
///
/// Returns a [`FileError`] if the file cannot be opened, seeked or read, or
/// is shorter than `size`.
pub fn read_partial_key(path: &Path, size: u64, window: u64) -> Result<PartialKey, FileError> {
    let io_err = |e: io::Error| FileError::from_io(path, e);
    let mut file = File::open(path).map_err(io_err)?;
    read_partial_key_from(&mut file, size, window).map_err(io_err)
}

/// Read the partial key of `size` bytes starting at the current position of
/// `reader`.
///
/// Content no larger than `2 * window` is consumed in a single forward pass
/// with no seek. Larger content reads the prefix window, seeks once to
/// `size - window` and reads the suffix window.
///
/// # Errors
///
/// Returns the underlying I/O error, or [`io::ErrorKind::UnexpectedEof`] if
/// the reader holds fewer bytes than `size`.
pub fn read_partial_key_from<R: Read + Seek>(
    reader: &mut R,
    size: u64,
    window: u64,
) -> io::Result<PartialKey> {
    if size <= window.saturating_mul(2) {
        let prefix = fingerprint(reader, size)?;
        return Ok(PartialKey {
            prefix,
            suffix: None,
        });
    }

    let prefix = fingerprint(reader, window)?;
    reader.seek(SeekFrom::Start(size - window))?;
    let suffix = fingerprint(reader, window)?;
    Ok(PartialKey {
        prefix,
        suffix: Some(suffix),
    })
}

/// Statistics from the partial-content stage.
#[derive(Debug, Clone, Default)]
pub struct PartialStats {
    /// Number of files whose windows were read
    pub total_files: usize,
    /// Number of files eliminated as unique within their size bucket
    pub eliminated_unique: usize,
    /// Number of subgroups with 2+ files
    pub subgroups: usize,
    /// Number of files in subgroups with 2+ files
    pub potential_duplicates: usize,
    /// Files dropped because they could not be read
    pub errors: Vec<FileError>,
}

impl PartialStats {
    /// Percentage of files eliminated by the partial comparison.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Subdivide size buckets by partial content (stage 2).
///
/// Reads run on the engine's worker pool. Singleton subgroups are
/// discarded; each returned subgroup is sorted by path, and subgroups are
/// ordered by size, then by first path.
pub fn filter_by_partial_content(
    size_groups: HashMap<u64, Vec<FileRecord>>,
    window: u64,
    engine: &HashEngine,
) -> (Vec<Vec<FileRecord>>, PartialStats) {
    let mut buckets: Vec<(u64, Vec<FileRecord>)> = size_groups
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .collect();
    buckets.sort_by_key(|(size, _)| *size);

    let candidates: Vec<Candidate> = buckets
        .into_iter()
        .enumerate()
        .flat_map(|(group, (_, files))| files.into_iter().map(move |file| Candidate { group, file }))
        .collect();

    let mut stats = PartialStats {
        total_files: candidates.len(),
        ..Default::default()
    };

    if let Some(callback) = engine.progress() {
        callback.on_phase_start("partial", candidates.len());
    }

    let results = engine.run(candidates, |file| {
        read_partial_key(&file.path, file.size, window)
    });

    let mut by_key: HashMap<(usize, PartialKey), Vec<FileRecord>> = HashMap::new();
    for (candidate, result) in results {
        match result {
            Ok(key) => by_key
                .entry((candidate.group, key))
                .or_default()
                .push(candidate.file),
            Err(e) => {
                log::warn!("Excluding file: {}", e);
                stats.errors.push(e);
            }
        }
    }

    let mut subgroups: Vec<Vec<FileRecord>> = Vec::new();
    for (_, mut files) in by_key {
        if files.len() < 2 {
            stats.eliminated_unique += files.len();
            continue;
        }
        files.sort();
        stats.subgroups += 1;
        stats.potential_duplicates += files.len();
        subgroups.push(files);
    }
    subgroups.sort_by(|a, b| (a[0].size, &a[0].path).cmp(&(b[0].size, &b[0].path)));

    if let Some(callback) = engine.progress() {
        callback.on_phase_end("partial");
    }

    log::info!(
        "Partial stage complete: {} files -> {} potential duplicates ({:.1}% eliminated)",
        stats.total_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (subgroups, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Hasher;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> FileRecord {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        FileRecord::new(path, content.len() as u64)
    }

    fn engine() -> HashEngine {
        HashEngine::sequential(Arc::new(Hasher::default()))
    }

    fn bucket(files: Vec<FileRecord>) -> HashMap<u64, Vec<FileRecord>> {
        let mut map: HashMap<u64, Vec<FileRecord>> = HashMap::new();
        for file in files {
            map.entry(file.size).or_default().push(file);
        }
        map
    }

    #[test]
    fn test_small_file_has_no_suffix() {
        let dir = TempDir::new().unwrap();
        let file = create_test_file(dir.path(), "small", b"0123456789");

        let key = read_partial_key(&file.path, file.size, 8).unwrap();

        assert!(key.is_whole_file());
        assert!(key.suffix().is_none());
        assert_eq!(key.prefix(), blake3::hash(b"0123456789").as_bytes());
    }

    #[test]
    fn test_large_file_reads_both_windows() {
        let dir = TempDir::new().unwrap();
        let file = create_test_file(dir.path(), "large", b"AAAA-middle-BBBB");

        let key = read_partial_key(&file.path, file.size, 4).unwrap();

        assert!(!key.is_whole_file());
        assert_eq!(key.prefix(), blake3::hash(b"AAAA").as_bytes());
        assert_eq!(key.suffix(), Some(blake3::hash(b"BBBB").as_bytes()));
    }

    #[test]
    fn test_key_ignores_middle() {
        let dir = TempDir::new().unwrap();
        let a = create_test_file(dir.path(), "a", b"AAAA-xxxxxx-BBBB");
        let b = create_test_file(dir.path(), "b", b"AAAA-yyyyyy-BBBB");

        let key_a = read_partial_key(&a.path, a.size, 4).unwrap();
        let key_b = read_partial_key(&b.path, b.size, 4).unwrap();
        assert_eq!(key_a, key_b);
    }

    #[test]
    fn test_exactly_two_windows_is_whole_file() {
        let dir = TempDir::new().unwrap();
        let file = create_test_file(dir.path(), "f", b"12345678");

        let key = read_partial_key(&file.path, file.size, 4).unwrap();
        assert!(key.is_whole_file());
    }

    /// Counts bytes read and seeks performed on the inner reader.
    struct CountingReader<R> {
        inner: R,
        bytes_read: u64,
        seeks: usize,
    }

    impl<R> CountingReader<R> {
        fn new(inner: R) -> Self {
            Self {
                inner,
                bytes_read: 0,
                seeks: 0,
            }
        }
    }

    impl<R: Read> Read for CountingReader<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.bytes_read += n as u64;
            Ok(n)
        }
    }

    impl<R: Seek> Seek for CountingReader<R> {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.seeks += 1;
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_short_content_is_one_forward_pass() {
        for content in [&b""[..], &b"abc"[..], &b"0123456789"[..], &b"0123456789abcdef"[..]] {
            let mut reader = CountingReader::new(io::Cursor::new(content));
            let key = read_partial_key_from(&mut reader, content.len() as u64, 8).unwrap();

            assert!(key.is_whole_file());
            assert_eq!(key.prefix(), blake3::hash(content).as_bytes());
            assert_eq!(reader.seeks, 0);
            assert_eq!(reader.bytes_read, content.len() as u64);
        }
    }

    #[test]
    fn test_long_content_reads_only_the_windows() {
        let content = b"AAAA-the-unread-middle-BBBB";
        let mut reader = CountingReader::new(io::Cursor::new(&content[..]));

        let key = read_partial_key_from(&mut reader, content.len() as u64, 4).unwrap();

        assert_eq!(key.suffix(), Some(blake3::hash(b"BBBB").as_bytes()));
        assert_eq!(reader.seeks, 1);
        assert_eq!(reader.bytes_read, 8);
    }

    #[test]
    fn test_short_reader_is_unexpected_eof() {
        let mut reader = io::Cursor::new(&b"tiny"[..]);
        let err = read_partial_key_from(&mut reader, 10, 8).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_shrunk_file_is_error() {
        let dir = TempDir::new().unwrap();
        let file = create_test_file(dir.path(), "f", b"short");

        let result = read_partial_key(&file.path, 100, 1024);
        assert!(matches!(result, Err(FileError::Io { .. })));
    }

    #[test]
    fn test_filter_splits_bucket() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            create_test_file(dir.path(), "a", b"hello"),
            create_test_file(dir.path(), "b", b"hello"),
            create_test_file(dir.path(), "c", b"world"),
        ];

        let (subgroups, stats) =
            filter_by_partial_content(bucket(files), DEFAULT_PARTIAL_WINDOW, &engine());

        assert_eq!(subgroups.len(), 1);
        assert_eq!(subgroups[0].len(), 2);
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.eliminated_unique, 1);
        assert_eq!(stats.subgroups, 1);
    }

    #[test]
    fn test_filter_keeps_middle_differences() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            create_test_file(dir.path(), "a", b"AAAA-xxxxxx-BBBB"),
            create_test_file(dir.path(), "b", b"AAAA-yyyyyy-BBBB"),
        ];

        let (subgroups, _) = filter_by_partial_content(bucket(files), 4, &engine());
        assert_eq!(subgroups.len(), 1);
    }

    #[test]
    fn test_filter_tags_unreadable_files() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            create_test_file(dir.path(), "a", b"same"),
            create_test_file(dir.path(), "b", b"same"),
            FileRecord::new(PathBuf::from("/nonexistent/dupefind/z"), 4),
        ];

        let (subgroups, stats) = filter_by_partial_content(bucket(files), 1024, &engine());

        assert_eq!(subgroups.len(), 1);
        assert_eq!(subgroups[0].len(), 2);
        assert_eq!(stats.errors.len(), 1);
    }

    #[test]
    fn test_filter_orders_subgroups_by_size() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            create_test_file(dir.path(), "long1", b"longer content"),
            create_test_file(dir.path(), "long2", b"longer content"),
            create_test_file(dir.path(), "short1", b"abc"),
            create_test_file(dir.path(), "short2", b"abc"),
        ];

        let (subgroups, _) = filter_by_partial_content(bucket(files), 1024, &engine());

        assert_eq!(subgroups.len(), 2);
        assert_eq!(subgroups[0][0].size, 3);
        assert_eq!(subgroups[1][0].size, 14);
    }

    #[test]
    fn test_filter_empty_input() {
        let (subgroups, stats) = filter_by_partial_content(HashMap::new(), 1024, &engine());
        assert!(subgroups.is_empty());
        assert_eq!(stats.elimination_rate(), 0.0);
    }
}
