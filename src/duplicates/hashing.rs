//! Full-content hashing across a bounded worker pool.
//!
//! # Overview
//!
//! [`HashEngine`] owns the worker pool used by every content-reading stage.
//! Each task processes one file independently and returns a tagged result;
//! nothing is shared between tasks. The coordinating thread merges the
//! collected results only after the pool has finished, so no lock is held
//! across file I/O.
//!
//! Per-file failures come back as `Err(FileError)`, which can never be
//! grouped with a digest. Such files are logged, counted and dropped.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dupefind::duplicates::HashEngine;
//! use dupefind::scanner::{FileRecord, HashAlgorithm, Hasher};
//! use std::path::PathBuf;
//!
//! let engine = HashEngine::parallel(Arc::new(Hasher::new(HashAlgorithm::Sha256)), 4).unwrap();
//! let subgroup = vec![
//!     FileRecord::new(PathBuf::from("/data/a.bin"), 4096),
//!     FileRecord::new(PathBuf::from("/data/b.bin"), 4096),
//! ];
//! let (groups, stats) = engine.hash_subgroups(vec![subgroup]);
//! println!("{} hash groups, {} errors", groups.len(), stats.errors.len());
//! ```

use std::borrow::Borrow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::ConfigError;
use crate::progress::ProgressCallback;
use crate::scanner::{FileError, FileHasher, FileRecord, HashDigest};

/// A file queued for a pool stage, tagged with the subgroup it came from.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Index of the originating subgroup
    pub group: usize,
    /// The file to process
    pub file: FileRecord,
}

impl Borrow<FileRecord> for Candidate {
    fn borrow(&self) -> &FileRecord {
        &self.file
    }
}

/// Files sharing a digest within one partial-content subgroup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashGroup {
    /// Shared content digest
    pub digest: HashDigest,
    /// Members, sorted by path
    pub files: Vec<FileRecord>,
}

/// Statistics from the hashing stage.
#[derive(Debug, Clone, Default)]
pub struct HashStats {
    /// Number of files submitted for hashing
    pub total_files: usize,
    /// Number of files successfully hashed
    pub hashed: usize,
    /// Number of files whose digest matched no other file in their subgroup
    pub unique_hashes: usize,
    /// Number of hash groups with 2+ files
    pub duplicate_groups: usize,
    /// Number of files in hash groups with 2+ files
    pub duplicate_files: usize,
    /// Total bytes hashed
    pub bytes_hashed: u64,
    /// Files dropped because they could not be read
    pub errors: Vec<FileError>,
}

/// Bounded executor for per-file work.
pub struct HashEngine {
    hasher: Arc<dyn FileHasher>,
    pool: Option<rayon::ThreadPool>,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for HashEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashEngine")
            .field("algorithm", &self.hasher.algorithm())
            .field("workers", &self.workers())
            .field("shutdown_flag", &self.shutdown_flag.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl HashEngine {
    /// Engine that processes one file at a time on the calling thread.
    #[must_use]
    pub fn sequential(hasher: Arc<dyn FileHasher>) -> Self {
        Self {
            hasher,
            pool: None,
            shutdown_flag: None,
            progress: None,
        }
    }

    /// Engine backed by a dedicated pool of `workers` threads.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `workers` is zero or the pool cannot be
    /// created.
    pub fn parallel(hasher: Arc<dyn FileHasher>, workers: usize) -> Result<Self, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workers",
                reason: "must be at least 1".to_string(),
            });
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("dupefind-worker-{i}"))
            .build()?;
        Ok(Self {
            hasher,
            pool: Some(pool),
            shutdown_flag: None,
            progress: None,
        })
    }

    /// Set the shutdown flag checked before each file is started.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress observer.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Number of files processed concurrently.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(1, rayon::ThreadPool::current_num_threads)
    }

    /// The content hasher used by [`HashEngine::hash_subgroups`].
    #[must_use]
    pub fn hasher(&self) -> &dyn FileHasher {
        self.hasher.as_ref()
    }

    pub(crate) fn progress(&self) -> Option<&dyn ProgressCallback> {
        self.progress.as_deref()
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Apply `task` to every item, on the pool when there is one.
    ///
    /// Results keep input order. Items not started because shutdown was
    /// requested are absent from the output.
    pub fn run<T, R, F>(&self, items: Vec<T>, task: F) -> Vec<(T, R)>
    where
        T: Borrow<FileRecord> + Send,
        R: Send,
        F: Fn(&FileRecord) -> R + Send + Sync,
    {
        let process = |(idx, item): (usize, T)| -> Option<(T, R)> {
            if self.is_shutdown_requested() {
                log::trace!("Shutdown requested, skipping remaining files");
                return None;
            }

            let record: &FileRecord = item.borrow();
            if let Some(ref callback) = self.progress {
                callback.on_progress(idx + 1, record.path.to_string_lossy().as_ref());
            }
            let result = task(record);
            if let Some(ref callback) = self.progress {
                callback.on_item_completed(record.size);
            }
            Some((item, result))
        };

        match &self.pool {
            Some(pool) => pool.install(|| {
                items
                    .into_par_iter()
                    .enumerate()
                    .filter_map(process)
                    .collect()
            }),
            None => items.into_iter().enumerate().filter_map(process).collect(),
        }
    }

    /// Group each subgroup's files by full-content digest.
    ///
    /// Files from different subgroups are never grouped together, even if
    /// their digests collide. Singleton hash groups are discarded. The output
    /// is sorted by digest, then by first path.
    pub fn hash_subgroups(&self, subgroups: Vec<Vec<FileRecord>>) -> (Vec<HashGroup>, HashStats) {
        let candidates: Vec<Candidate> = subgroups
            .into_iter()
            .enumerate()
            .flat_map(|(group, files)| files.into_iter().map(move |file| Candidate { group, file }))
            .collect();

        let mut stats = HashStats {
            total_files: candidates.len(),
            ..Default::default()
        };

        if let Some(ref callback) = self.progress {
            callback.on_phase_start("hash", candidates.len());
        }

        let results = self.run(candidates, |file| self.hasher.hash_file(&file.path));

        let mut by_digest: HashMap<(usize, HashDigest), Vec<FileRecord>> = HashMap::new();
        for (candidate, result) in results {
            match result {
                Ok(digest) => {
                    stats.hashed += 1;
                    stats.bytes_hashed += candidate.file.size;
                    by_digest
                        .entry((candidate.group, digest))
                        .or_default()
                        .push(candidate.file);
                }
                Err(e) => {
                    log::warn!("Excluding file: {}", e);
                    stats.errors.push(e);
                }
            }
        }

        let mut groups: Vec<HashGroup> = Vec::new();
        for ((_, digest), mut files) in by_digest {
            if files.len() < 2 {
                stats.unique_hashes += files.len();
                continue;
            }
            files.sort();
            stats.duplicate_groups += 1;
            stats.duplicate_files += files.len();
            groups.push(HashGroup { digest, files });
        }
        groups.sort_by(|a, b| a.digest.cmp(&b.digest).then_with(|| a.files.cmp(&b.files)));

        if let Some(ref callback) = self.progress {
            callback.on_phase_end("hash");
        }

        log::info!(
            "Hash stage complete: {} files hashed -> {} duplicate groups ({} files, {} errors)",
            stats.hashed,
            stats.duplicate_groups,
            stats.duplicate_files,
            stats.errors.len()
        );

        (groups, stats)
    }

    /// Hash a single group of candidate files and group them by digest.
    ///
    /// Singleton hash groups are discarded.
    pub fn group_by_hash(
        &self,
        files: Vec<FileRecord>,
    ) -> (HashMap<HashDigest, Vec<FileRecord>>, HashStats) {
        let (groups, stats) = self.hash_subgroups(vec![files]);
        let map = groups
            .into_iter()
            .map(|group| (group.digest, group.files))
            .collect();
        (map, stats)
    }
}
