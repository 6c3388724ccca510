//! Exhaustive byte comparison.
//!
//! A shared digest is never treated as proof of equality. For each group
//! believed identical, the first remaining file becomes the reference and
//! is compared chunk by chunk against every other remaining file. Files
//! equal to the reference form one confirmed set; the rest are compared
//! again among themselves. One input group may therefore yield zero, one or
//! several disjoint sets.
//!
//! A read failure during comparison never aborts the group: the unreadable
//! file is logged, dropped from every set and handed back as a
//! [`FileError`] for the run summary.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::scanner::{FileError, FileRecord};

/// Default chunk size for lock-step comparison (4 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Fill `buf` as far as possible, stopping only at EOF.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Compare two files byte for byte.
///
/// Both files are read in lock-step, `chunk_size` bytes at a time. They are
/// equal iff every chunk pair matches and both reach EOF together.
///
/// # Errors
///
/// Returns a [`FileError`] for the file that could not be opened or read.
pub fn files_identical(a: &Path, b: &Path, chunk_size: usize) -> Result<bool, FileError> {
    let chunk_size = chunk_size.max(1);
    let mut file_a = File::open(a).map_err(|e| FileError::from_io(a, e))?;
    let mut file_b = File::open(b).map_err(|e| FileError::from_io(b, e))?;

    let mut buf_a = vec![0u8; chunk_size];
    let mut buf_b = vec![0u8; chunk_size];

    loop {
        let n_a = read_full(&mut file_a, &mut buf_a).map_err(|e| FileError::from_io(a, e))?;
        let n_b = read_full(&mut file_b, &mut buf_b).map_err(|e| FileError::from_io(b, e))?;

        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a == 0 {
            return Ok(true);
        }
    }
}

/// Compare two files, treating any failure as "not equal".
#[must_use]
pub fn compare_files(a: &Path, b: &Path, chunk_size: usize) -> bool {
    match files_identical(a, b, chunk_size) {
        Ok(equal) => equal,
        Err(e) => {
            log::warn!(
                "Cannot compare {} with {}: {}",
                a.display(),
                b.display(),
                e
            );
            false
        }
    }
}

/// Statistics from the verification stage.
#[derive(Debug, Clone, Default)]
pub struct VerifyStats {
    /// Number of groups submitted
    pub groups_checked: usize,
    /// Number of pairwise comparisons performed
    pub comparisons: usize,
    /// Number of confirmed sets emitted
    pub confirmed_sets: usize,
    /// Number of files that matched no other file in their group
    pub rejected_files: usize,
    /// Files that could not be read during comparison
    pub errors: Vec<FileError>,
}

/// Split one group into sets of pairwise byte-identical files (stage 4).
///
/// Each returned set has at least two members and keeps input order. A file
/// that cannot be read is excluded from every set and reported in
/// [`VerifyStats::errors`].
pub fn partition_identical(
    files: Vec<FileRecord>,
    chunk_size: usize,
) -> (Vec<Vec<FileRecord>>, VerifyStats) {
    let mut stats = VerifyStats {
        groups_checked: 1,
        ..Default::default()
    };
    let mut sets = Vec::new();
    let mut remaining = files;

    while remaining.len() > 1 {
        let mut candidates = std::mem::take(&mut remaining).into_iter();
        let Some(reference) = candidates.next() else {
            break;
        };

        // Compared candidates in input order, tagged with the outcome
        let mut compared: Vec<(bool, FileRecord)> = Vec::new();
        let mut reference_failed = false;
        for candidate in candidates.by_ref() {
            stats.comparisons += 1;
            if candidate.size != reference.size {
                compared.push((false, candidate));
                continue;
            }
            match files_identical(&reference.path, &candidate.path, chunk_size) {
                Ok(equal) => compared.push((equal, candidate)),
                Err(e) if e.path() == reference.path.as_path() => {
                    log::warn!("Excluding {} from verification: {}", reference.path.display(), e);
                    stats.errors.push(e);
                    compared.push((false, candidate));
                    reference_failed = true;
                    break;
                }
                Err(e) => {
                    log::warn!("Excluding {} from verification: {}", candidate.path.display(), e);
                    stats.errors.push(e);
                    stats.rejected_files += 1;
                }
            }
        }

        if reference_failed {
            // Nothing compared against an unreadable reference counts
            stats.rejected_files += 1;
            remaining = compared.into_iter().map(|(_, file)| file).collect();
            remaining.extend(candidates);
            continue;
        }

        let mut equal = Vec::new();
        for (is_equal, file) in compared {
            if is_equal {
                equal.push(file);
            } else {
                remaining.push(file);
            }
        }

        if equal.is_empty() {
            log::debug!("No identical copy of {}", reference.path.display());
            stats.rejected_files += 1;
        } else {
            equal.insert(0, reference);
            stats.confirmed_sets += 1;
            sets.push(equal);
        }
    }
    stats.rejected_files += remaining.len();

    (sets, stats)
}
