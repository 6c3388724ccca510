//! Directory walker implementation using jwalk for parallel traversal.
//!
//! # Overview
//!
//! [`Walker`] traverses a directory tree and yields a [`FileRecord`] for every
//! regular, currently readable file. It uses [`jwalk`] for parallel directory
//! reading with children sorted by name, so output order is deterministic.
//!
//! # Filtering
//!
//! - Hidden entries (names starting with `.`) are skipped unless
//!   `include_hidden` is set; hidden directories are not descended into.
//! - Exclude patterns use gitignore syntax via the `ignore` crate and are
//!   matched against the path relative to the root, including every parent
//!   directory. Excluded directories are pruned.
//! - Symlinks are skipped unless `follow_symlinks` is set.
//! - Empty files are kept.
//!
//! # Example
//!
//! ```no_run
//! use dupefind::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     exclude: vec!["node_modules".to_string(), "*.tmp".to_string()],
//!     skip_inaccessible: true,
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), config);
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;

use super::path_utils::normalize_path;
use super::{FileRecord, ScanError, WalkerConfig};

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build the exclude matcher from the configured patterns.
    fn build_excludes(&self) -> Option<Gitignore> {
        if self.config.exclude.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        for pattern in &self.config.exclude {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid exclude pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Failed to build exclude patterns: {}", e);
                None
            }
        }
    }

    /// Walk the directory tree, yielding file records.
    ///
    /// Inaccessible entries are yielded as [`ScanError`] values, or logged and
    /// skipped when `skip_inaccessible` is set. Iteration never stops early
    /// on an error, but ends at the first entry pulled after shutdown is
    /// requested.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileRecord, ScanError>> + '_ {
        let excludes = self.build_excludes();
        let root = self.root.clone();

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(!self.config.include_hidden)
            .process_read_dir(move |_depth, _path, _read_dir_state, children| {
                // Prune excluded entries so excluded directories are never read
                if let Some(gi) = &excludes {
                    children.retain(|child| match child {
                        Ok(entry) => {
                            let path = entry.path();
                            !is_excluded(gi, &root, &path, entry.file_type().is_dir())
                        }
                        Err(_) => true,
                    });
                }
                // Sort children for deterministic output
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        walk_dir
            .into_iter()
            .take_while(move |_| {
                let stop = self.is_shutdown_requested();
                if stop {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                }
                !stop
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    let path = entry.path();
                    if path == self.root {
                        return None;
                    }

                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        return None;
                    }

                    if file_type.is_symlink() && !self.config.follow_symlinks {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }

                    self.process_file(path)
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    self.handle_jwalk_error(path, e)
                }
            })
    }

    /// Stat and open-check a candidate file.
    fn process_file(&self, path: PathBuf) -> Option<Result<FileRecord, ScanError>> {
        let metadata = if self.config.follow_symlinks {
            std::fs::metadata(&path)
        } else {
            std::fs::symlink_metadata(&path)
        };

        let metadata = match metadata {
            Ok(m) => m,
            Err(e) => return self.handle_io_error(&path, e),
        };

        if !metadata.is_file() {
            return None;
        }

        // Existing but unreadable files never reach the pipeline
        if let Err(e) = File::open(&path) {
            return self.handle_io_error(&path, e);
        }

        Some(Ok(FileRecord::new(normalize_path(&path), metadata.len())))
    }

    /// Map an I/O error to a [`ScanError`], or skip it.
    fn handle_io_error(
        &self,
        path: &Path,
        error: std::io::Error,
    ) -> Option<Result<FileRecord, ScanError>> {
        use std::io::ErrorKind;

        if self.config.skip_inaccessible {
            log::warn!("Skipping inaccessible {}: {}", path.display(), error);
            return None;
        }

        let err = match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path.to_path_buf())
            }
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
                ScanError::NotFound(path.to_path_buf())
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                }
            }
        };
        Some(Err(err))
    }

    fn handle_jwalk_error(
        &self,
        path: PathBuf,
        error: jwalk::Error,
    ) -> Option<Result<FileRecord, ScanError>> {
        if self.config.skip_inaccessible {
            log::warn!("Skipping inaccessible {}: {}", path.display(), error);
            return None;
        }

        log::warn!("Walker error for {}: {}", path.display(), error);
        let source = match error.io_error() {
            Some(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                return Some(Err(ScanError::PermissionDenied(path)));
            }
            Some(io) => std::io::Error::new(io.kind(), error.to_string()),
            None => std::io::Error::other(error.to_string()),
        };
        Some(Err(ScanError::Io { path, source }))
    }
}

/// Whether `path` (or any directory above it, up to `root`) is excluded.
fn is_excluded(gitignore: &Gitignore, root: &Path, path: &Path, is_dir: bool) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    if relative.as_os_str().is_empty() || relative.has_root() {
        return false;
    }
    gitignore
        .matched_path_or_any_parents(relative, is_dir)
        .is_ignore()
}
