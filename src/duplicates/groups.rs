//! Size grouping and the duplicate report structures.
//!
//! # Overview
//!
//! Size grouping is the first stage of duplicate detection: files with
//! different byte lengths cannot be identical, so grouping by exact size
//! removes most non-duplicates without reading any content.
//!
//! The stage re-stats every record before grouping, because a file may have
//! changed or vanished since the scanner saw it. Records that can no longer
//! be stat'ed are tagged with a [`FileError`] and dropped.
//!
//! # Example
//!
//! ```no_run
//! use dupefind::scanner::FileRecord;
//! use dupefind::duplicates::group_by_size;
//! use std::path::PathBuf;
//!
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/data/a.txt"), 1024),
//!     FileRecord::new(PathBuf::from("/data/b.txt"), 1024),
//!     FileRecord::new(PathBuf::from("/data/c.txt"), 2048),
//! ];
//!
//! let (groups, stats) = group_by_size(files);
//! println!("{} of {} files share a size", stats.potential_duplicates, stats.total_files);
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use crate::scanner::{FileError, FileRecord};

/// Synthetic group key used when content hashing is disabled.
///
/// Zero-padded so lexical key order equals numeric size order.
#[must_use]
pub fn size_key(size: u64) -> String {
    format!("size:{size:020}")
}

/// A set of files confirmed (or, without verification, believed) to be
/// byte-identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSet {
    /// File size in bytes, shared by every member
    pub size: u64,
    /// Members, sorted by path
    pub files: Vec<FileRecord>,
    /// Whether membership was confirmed by byte comparison
    pub verified: bool,
}

impl DuplicateSet {
    /// Create a set. Members are sorted by path.
    #[must_use]
    pub fn new(size: u64, mut files: Vec<FileRecord>, verified: bool) -> Self {
        files.sort();
        Self {
            size,
            files,
            verified,
        }
    }

    /// Number of files in this set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all files in this set.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.size * self.files.len() as u64
    }

    /// Space reclaimable by keeping a single copy.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Number of redundant copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Get just the paths of files in this set.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

/// Final result of a run: group key to duplicate set, in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateReport {
    sets: BTreeMap<String, DuplicateSet>,
}

impl DuplicateReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a set under `key`, replacing any previous set with that key.
    pub fn insert(&mut self, key: String, set: DuplicateSet) {
        self.sets.insert(key, set);
    }

    /// Whether a set is already stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.sets.contains_key(key)
    }

    /// Look up the set stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&DuplicateSet> {
        self.sets.get(key)
    }

    /// Number of duplicate sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// True when no duplicates were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Iterate over `(key, set)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DuplicateSet)> {
        self.sets.iter()
    }

    /// Iterate over the sets in key order.
    pub fn sets(&self) -> impl Iterator<Item = &DuplicateSet> {
        self.sets.values()
    }

    /// Total number of files across all sets.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.sets.values().map(DuplicateSet::len).sum()
    }

    /// Number of redundant copies across all sets.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.sets.values().map(DuplicateSet::duplicate_count).sum()
    }

    /// Reclaimable bytes across all sets.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.sets.values().map(DuplicateSet::wasted_space).sum()
    }

    /// Membership as sorted path lists, for comparing runs.
    #[must_use]
    pub fn membership(&self) -> Vec<Vec<PathBuf>> {
        let mut groups: Vec<Vec<PathBuf>> = self.sets.values().map(DuplicateSet::paths).collect();
        groups.sort();
        groups
    }
}

impl IntoIterator for DuplicateReport {
    type Item = (String, DuplicateSet);
    type IntoIter = std::collections::btree_map::IntoIter<String, DuplicateSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.into_iter()
    }
}

/// Statistics from the size grouping stage.
#[derive(Debug, Clone, Default)]
pub struct GroupingStats {
    /// Total number of records received
    pub total_files: usize,
    /// Total size of all files that could be stat'ed, in bytes
    pub total_size: u64,
    /// Number of unique file sizes
    pub unique_sizes: usize,
    /// Number of files that could be duplicates (in buckets of 2+)
    pub potential_duplicates: usize,
    /// Number of files eliminated as unique (singleton buckets)
    pub eliminated_unique: usize,
    /// Number of empty files encountered
    pub empty_files: usize,
    /// Number of size buckets with 2+ files
    pub duplicate_groups: usize,
    /// Records dropped because their path was already seen
    pub repeated_paths: usize,
    /// Files dropped because they could no longer be stat'ed
    pub errors: Vec<FileError>,
}

impl GroupingStats {
    /// Percentage of files eliminated by size grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Re-stat a record, returning it with its current size.
fn restat(file: FileRecord) -> Result<FileRecord, FileError> {
    let metadata = std::fs::metadata(&file.path).map_err(|e| FileError::from_io(&file.path, e))?;
    if !metadata.is_file() {
        return Err(FileError::NotAFile(file.path));
    }
    Ok(FileRecord {
        size: metadata.len(),
        ..file
    })
}

/// Group files by size (stage 1 of duplicate detection).
///
/// Every record is re-stat'ed and grouped by its current length. Records
/// that fail the stat are reported in [`GroupingStats::errors`].
///
/// # Returns
///
/// A tuple of:
/// - `HashMap<u64, Vec<FileRecord>>` - Files grouped by size (only buckets with 2+ files)
/// - `GroupingStats` - Statistics about the grouping operation
#[must_use]
pub fn group_by_size(
    files: impl IntoIterator<Item = FileRecord>,
) -> (HashMap<u64, Vec<FileRecord>>, GroupingStats) {
    let mut all_groups: HashMap<u64, Vec<FileRecord>> = HashMap::new();
    let mut stats = GroupingStats::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for file in files {
        stats.total_files += 1;

        // A file is never a duplicate of itself
        if !seen.insert(file.path.clone()) {
            log::debug!("Ignoring repeated path: {}", file.path.display());
            stats.repeated_paths += 1;
            continue;
        }

        let file = match restat(file) {
            Ok(file) => file,
            Err(e) => {
                log::warn!("Excluding file: {}", e);
                stats.errors.push(e);
                continue;
            }
        };

        stats.total_size += file.size;
        if file.size == 0 {
            stats.empty_files += 1;
        }
        all_groups.entry(file.size).or_default().push(file);
    }

    stats.unique_sizes = all_groups.len();

    let filtered_groups: HashMap<u64, Vec<FileRecord>> = all_groups
        .into_iter()
        .filter(|(size, files)| {
            if files.len() == 1 {
                stats.eliminated_unique += 1;
                log::trace!(
                    "Eliminated unique size {}: {}",
                    size,
                    files[0].path.display()
                );
                false
            } else {
                stats.potential_duplicates += files.len();
                stats.duplicate_groups += 1;
                log::debug!(
                    "Size group {} bytes: {} potential duplicates",
                    size,
                    files.len()
                );
                true
            }
        })
        .collect();

    log::info!(
        "Size stage complete: {} files -> {} potential duplicates ({:.1}% eliminated)",
        stats.total_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (filtered_groups, stats)
}
