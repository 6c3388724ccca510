//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based file grouping (stage 1)
//! - Partial-content prefiltering (stage 2)
//! - Full-content hashing on a bounded worker pool (stage 3)
//! - Byte-for-byte verification (stage 4)
//! - Pipeline orchestration and the final report

pub mod finder;
pub mod groups;
pub mod hashing;
pub mod partial;
pub mod verify;

pub use finder::{
    default_workers, format_size, DuplicateFinder, FinderConfig, FinderError, ScanSummary,
};
pub use groups::{group_by_size, size_key, DuplicateReport, DuplicateSet, GroupingStats};
pub use hashing::{Candidate, HashEngine, HashGroup, HashStats};
pub use partial::{
    filter_by_partial_content, read_partial_key, read_partial_key_from, PartialKey, PartialStats,
    DEFAULT_PARTIAL_WINDOW,
};
pub use verify::{
    compare_files, files_identical, partition_identical, VerifyStats, DEFAULT_CHUNK_SIZE,
};
