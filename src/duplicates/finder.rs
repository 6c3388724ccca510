//! Duplicate finder: the staged detection pipeline.
//!
//! # Overview
//!
//! Candidate sets are narrowed in four stages, each cheaper per file than
//! the next:
//!
//! 1. **Size**: group by exact byte length (metadata only)
//! 2. **Partial**: compare fingerprints of the first and last window
//! 3. **Hash**: group by full-content digest (optional)
//! 4. **Verify**: exhaustive byte comparison (optional)
//!
//! With hashing disabled, partial subgroups go straight to verification under
//! a synthetic size key. With verification disabled, hash (or size) group
//! membership is accepted as proof; that is unsafe against collisions and is
//! flagged by [`DuplicateSet::verified`] being `false`.
//!
//! Files that fail at any stage are tagged, logged and excluded from later
//! stages; the run always completes for everything else.
//!
//! # Example
//!
//! ```no_run
//! use dupefind::duplicates::{DuplicateFinder, FinderConfig};
//! use dupefind::scanner::HashAlgorithm;
//! use std::path::Path;
//!
//! let config = FinderConfig::default()
//!     .with_hash_algorithm(HashAlgorithm::Sha256)
//!     .with_workers(4);
//! let finder = DuplicateFinder::new(config).unwrap();
//!
//! let (report, summary) = finder.find_duplicates(Path::new("/some/path")).unwrap();
//! println!("Found {} duplicate sets", report.len());
//! println!("Reclaimable space: {}", summary.reclaimable_display());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::groups::{group_by_size, size_key, DuplicateReport, DuplicateSet};
use super::hashing::HashEngine;
use super::partial::{filter_by_partial_content, DEFAULT_PARTIAL_WINDOW};
use super::verify::{partition_identical, DEFAULT_CHUNK_SIZE};
use crate::error::ConfigError;
use crate::progress::ProgressCallback;
use crate::scanner::{
    FileError, FileHasher, FileRecord, HashAlgorithm, Hasher, ScanError, Walker, WalkerConfig,
    DEFAULT_BLOCK_SIZE,
};

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Content hash algorithm.
    pub hash_algorithm: HashAlgorithm,
    /// Prefix/suffix window for the partial stage, in bytes.
    pub partial_window: u64,
    /// Run the full-content hash stage.
    pub hash_enabled: bool,
    /// Run the byte verification stage.
    pub verify_enabled: bool,
    /// Number of files read concurrently. One means sequential.
    pub workers: usize,
    /// Read block size for hashing.
    pub block_size: usize,
    /// Chunk size for byte comparison.
    pub chunk_size: usize,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("hash_algorithm", &self.hash_algorithm)
            .field("partial_window", &self.partial_window)
            .field("hash_enabled", &self.hash_enabled)
            .field("verify_enabled", &self.verify_enabled)
            .field("workers", &self.workers)
            .field("block_size", &self.block_size)
            .field("chunk_size", &self.chunk_size)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::default(),
            partial_window: DEFAULT_PARTIAL_WINDOW,
            hash_enabled: true,
            verify_enabled: true,
            workers: default_workers(),
            block_size: DEFAULT_BLOCK_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

/// Available parallelism, computed once per configuration.
#[must_use]
pub fn default_workers() -> usize {
    num_cpus::get().max(1)
}

impl FinderConfig {
    /// Set the content hash algorithm.
    #[must_use]
    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    /// Set the partial-content window size.
    #[must_use]
    pub fn with_partial_window(mut self, window: u64) -> Self {
        self.partial_window = window;
        self
    }

    /// Enable or disable the hash stage.
    #[must_use]
    pub fn with_hash(mut self, enabled: bool) -> Self {
        self.hash_enabled = enabled;
        self
    }

    /// Enable or disable byte verification.
    #[must_use]
    pub fn with_verify(mut self, enabled: bool) -> Self {
        self.verify_enabled = enabled;
        self
    }

    /// Set the worker count.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the hashing read block size.
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the comparison chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a zero window, worker
    /// count, block size or chunk size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = |field: &'static str| ConfigError::InvalidValue {
            field,
            reason: "must be greater than zero".to_string(),
        };
        if self.partial_window == 0 {
            return Err(zero("partial_window"));
        }
        if self.workers == 0 {
            return Err(zero("workers"));
        }
        if self.block_size == 0 {
            return Err(zero("block_size"));
        }
        if self.chunk_size == 0 {
            return Err(zero("chunk_size"));
        }
        Ok(())
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Total number of files handed to the pipeline
    pub total_files: usize,
    /// Total size of all files that could be stat'ed, in bytes
    pub total_size: u64,
    /// Files eliminated by size grouping (unique sizes)
    pub eliminated_by_size: usize,
    /// Files eliminated by the partial-content comparison
    pub eliminated_by_partial: usize,
    /// Files eliminated by a unique full-content digest
    pub eliminated_by_hash: usize,
    /// Files eliminated by byte verification
    pub eliminated_by_verify: usize,
    /// Bytes read by the hash stage
    pub bytes_hashed: u64,
    /// Number of duplicate sets reported
    pub duplicate_groups: usize,
    /// Total number of redundant copies (excluding one original per set)
    pub duplicate_files: usize,
    /// Total space that can be reclaimed by removing duplicates
    pub reclaimable_space: u64,
    /// Duration of the entire scan
    pub scan_duration: Duration,
    /// Files excluded because a stage could not process them
    pub file_errors: Vec<FileError>,
}

impl ScanSummary {
    /// Whether any file was excluded because of an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.file_errors.is_empty()
    }

    /// Calculate the percentage of space that is wasted by duplicates.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        format_size(self.reclaimable_space)
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        format_size(self.total_size)
    }
}

/// Format a byte size as a human-readable string (1024-based).
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Errors that terminate a run.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The scanner hit an entry it was not allowed to skip.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Duplicate finder that orchestrates the staged detection pipeline.
pub struct DuplicateFinder {
    config: FinderConfig,
    engine: HashEngine,
}

impl std::fmt::Debug for DuplicateFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateFinder")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .finish()
    }
}

impl DuplicateFinder {
    /// Create a finder that hashes with the configured algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid or the
    /// worker pool cannot be built.
    pub fn new(config: FinderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let hasher = Hasher::new(config.hash_algorithm).with_block_size(config.block_size);
        Self::with_hasher(config, Arc::new(hasher))
    }

    /// Create a finder with a custom content hasher.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid or the
    /// worker pool cannot be built.
    pub fn with_hasher(
        config: FinderConfig,
        hasher: Arc<dyn FileHasher>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut engine = if config.workers == 1 {
            HashEngine::sequential(hasher)
        } else {
            HashEngine::parallel(hasher, config.workers)?
        };
        if let Some(ref flag) = config.shutdown_flag {
            engine = engine.with_shutdown_flag(flag.clone());
        }
        if let Some(ref callback) = config.progress_callback {
            engine = engine.with_progress(callback.clone());
        }

        Ok(Self { config, engine })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Walk `path` and find all duplicate files beneath it.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The path does not exist or is not a directory
    /// - The walker reports an entry that may not be skipped
    /// - The scan is interrupted by shutdown signal
    pub fn find_duplicates(
        &self,
        path: &Path,
    ) -> Result<(DuplicateReport, ScanSummary), FinderError> {
        let start_time = Instant::now();

        if !path.exists() {
            return Err(FinderError::PathNotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(FinderError::NotADirectory(path.to_path_buf()));
        }

        log::info!("Starting duplicate scan of {}", path.display());
        self.check_shutdown()?;

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("walking", 0);
            callback.on_message(&format!("Walking {}", path.display()));
        }

        let mut walker = Walker::new(path, self.config.walker_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }

        let mut files = Vec::new();
        for result in walker.walk() {
            files.push(result?);
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("walking");
        }
        self.check_shutdown()?;

        log::info!("Found {} files under {}", files.len(), path.display());
        self.run_pipeline(files, start_time)
    }

    /// Find duplicates among an explicit list of files.
    ///
    /// An empty list yields an empty report.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Interrupted`] if shutdown is requested.
    pub fn find_duplicates_from_files(
        &self,
        files: Vec<FileRecord>,
    ) -> Result<(DuplicateReport, ScanSummary), FinderError> {
        self.run_pipeline(files, Instant::now())
    }

    fn check_shutdown(&self) -> Result<(), FinderError> {
        if self.config.is_shutdown_requested() {
            log::info!("Shutdown requested, stopping scan");
            return Err(FinderError::Interrupted);
        }
        Ok(())
    }

    fn run_pipeline(
        &self,
        files: Vec<FileRecord>,
        start_time: Instant,
    ) -> Result<(DuplicateReport, ScanSummary), FinderError> {
        let mut summary = ScanSummary {
            total_files: files.len(),
            ..Default::default()
        };
        self.check_shutdown()?;

        // Stage 1: size
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("size", files.len());
        }
        let (size_groups, size_stats) = group_by_size(files);
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("size");
        }
        summary.total_size = size_stats.total_size;
        summary.eliminated_by_size = size_stats.eliminated_unique;
        summary.file_errors.extend(size_stats.errors);
        self.check_shutdown()?;

        // Stage 2: partial content
        let (subgroups, partial_stats) =
            filter_by_partial_content(size_groups, self.config.partial_window, &self.engine);
        summary.eliminated_by_partial = partial_stats.eliminated_unique;
        summary.file_errors.extend(partial_stats.errors);
        self.check_shutdown()?;

        // Stage 3: full hash, or a synthetic size key
        let keyed: Vec<(String, Vec<FileRecord>)> = if self.config.hash_enabled {
            let (groups, hash_stats) = self.engine.hash_subgroups(subgroups);
            summary.eliminated_by_hash = hash_stats.unique_hashes;
            summary.bytes_hashed = hash_stats.bytes_hashed;
            summary.file_errors.extend(hash_stats.errors);
            groups
                .into_iter()
                .map(|group| (group.digest.to_string(), group.files))
                .collect()
        } else {
            log::debug!("Hash stage disabled, keying subgroups by size");
            subgroups
                .into_iter()
                .map(|files| (size_key(files.first().map_or(0, |f| f.size)), files))
                .collect()
        };
        self.check_shutdown()?;

        // Stage 4: verification and merge
        let report = self.verify_and_merge(keyed, &mut summary)?;

        summary.duplicate_groups = report.len();
        summary.duplicate_files = report.duplicate_count();
        summary.reclaimable_space = report.wasted_space();
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} duplicate sets, {} redundant files, {} reclaimable ({} files excluded by errors) in {:.2?}",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display(),
            summary.file_errors.len(),
            summary.scan_duration
        );

        Ok((report, summary))
    }

    fn verify_and_merge(
        &self,
        keyed: Vec<(String, Vec<FileRecord>)>,
        summary: &mut ScanSummary,
    ) -> Result<DuplicateReport, FinderError> {
        let verify = self.config.verify_enabled;
        let callback = self.config.progress_callback.as_ref().filter(|_| verify);
        if let Some(callback) = callback {
            callback.on_phase_start("verify", keyed.len());
        }

        let mut report = DuplicateReport::new();
        for (idx, (key, files)) in keyed.into_iter().enumerate() {
            self.check_shutdown()?;

            let size = files.first().map_or(0, |f| f.size);
            let sets = if verify {
                if let Some(callback) = callback {
                    if let Some(first) = files.first() {
                        callback.on_progress(idx + 1, first.path.to_string_lossy().as_ref());
                    }
                }
                let (sets, stats) = partition_identical(files, self.config.chunk_size);
                summary.eliminated_by_verify += stats.rejected_files;
                for error in stats.errors {
                    if !summary.file_errors.iter().any(|e| e.path() == error.path()) {
                        summary.file_errors.push(error);
                    }
                }
                sets
            } else {
                vec![files]
            };

            for set in sets {
                let unique = unique_key(&report, &key);
                if unique != key {
                    log::debug!("Group {} split by verification into {}", key, unique);
                }
                report.insert(unique, DuplicateSet::new(size, set, verify));
            }
        }

        if let Some(callback) = callback {
            callback.on_phase_end("verify");
        }
        Ok(report)
    }
}

/// `base`, or `base#2`, `base#3`, ... if already taken.
fn unique_key(report: &DuplicateReport, base: &str) -> String {
    if !report.contains_key(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}#{n}"))
        .find(|candidate| !report.contains_key(candidate))
        .unwrap_or_else(|| base.to_string())
}
