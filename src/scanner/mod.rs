//! File discovery and content hashing.
//!
//! This module provides functionality for:
//! - Recursive directory walking using jwalk, with hidden-file and
//!   gitignore-style exclude filtering
//! - Streaming content digests (MD5, SHA-1, SHA-256, SHA-512, BLAKE3)
//! - Path normalization (absolute, lexically cleaned, Unicode NFC)
//!
//! # Architecture
//!
//! - [`walker`]: Directory traversal and [`FileRecord`] discovery
//! - [`hasher`]: Algorithm selection and streaming digests
//! - [`path_utils`]: Path normalization
//!
//! # Example
//!
//! ```no_run
//! use dupefind::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     exclude: vec!["*.tmp".to_string()],
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("."), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod path_utils;
pub mod walker;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

pub use hasher::{FileHasher, HashAlgorithm, HashDigest, Hasher, DEFAULT_BLOCK_SIZE};
pub use walker::Walker;

/// A discovered regular file.
///
/// Records are created once per file and never mutated while a pipeline
/// run owns them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileRecord {
    /// Normalized absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileRecord {
    /// Create a new record from a path and size as reported by a scanner.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self { path, size }
    }

    /// Stat `path` and build a record with a normalized path.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] if the file cannot be stat'ed or is not a
    /// regular file.
    pub fn from_path(path: &Path) -> Result<Self, FileError> {
        let metadata = std::fs::metadata(path).map_err(|e| FileError::from_io(path, e))?;
        if !metadata.is_file() {
            return Err(FileError::NotAFile(path.to_path_buf()));
        }
        Ok(Self {
            path: path_utils::normalize_path(path),
            size: metadata.len(),
        })
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Include hidden files and directories (names starting with `.`).
    pub include_hidden: bool,

    /// Follow symbolic links during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_symlinks: bool,

    /// Log and skip entries that cannot be accessed instead of reporting
    /// them as errors.
    pub skip_inaccessible: bool,

    /// Gitignore-style exclude patterns (`*.tmp`, `node_modules`, `test*`).
    pub exclude: Vec<String>,
}

impl WalkerConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(
        include_hidden: bool,
        follow_symlinks: bool,
        skip_inaccessible: bool,
        exclude: Vec<String>,
    ) -> Self {
        Self {
            include_hidden,
            follow_symlinks,
            skip_inaccessible,
            exclude,
        }
    }
}

/// Errors that can occur during directory scanning.
///
/// Unless the walker is configured to skip inaccessible entries, these
/// abort a run before the pipeline starts.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Per-file failure tag.
///
/// Produced by any pipeline stage that cannot process a file. The file is
/// excluded from every later stage; the run itself continues.
#[derive(thiserror::Error, Debug, Clone)]
pub enum FileError {
    /// The file vanished between discovery and processing.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path no longer refers to a regular file.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: Arc<io::Error>,
    },
}

impl FileError {
    /// Classify an I/O error raised while accessing `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: Arc::new(error),
            },
        }
    }

    /// The file this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path) | Self::PermissionDenied(path) | Self::NotAFile(path) => path,
            Self::Io { path, .. } => path,
        }
    }
}
