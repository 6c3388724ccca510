//! Application configuration management.
//!
//! Settings are layered with `figment`, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `config.toml` in the platform config directory, or the file given with `--config`
//! 3. `DUPEFIND_*` environment variables (`DUPEFIND_HASH_TYPE=sha256`)
//! 4. Command-line flags
//!
//! ```toml
//! hash_type = "sha256"
//! partial_window = 65536
//! workers = 4
//! exclude = ["*.tmp", "node_modules"]
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::ScanArgs;
use crate::duplicates::{default_workers, FinderConfig, DEFAULT_CHUNK_SIZE, DEFAULT_PARTIAL_WINDOW};
use crate::error::ConfigError;
use crate::scanner::{HashAlgorithm, WalkerConfig, DEFAULT_BLOCK_SIZE};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "DUPEFIND_";

/// Application configuration.
///
/// The hash algorithm is kept as a name here and checked in
/// [`finder_config`](Self::finder_config), so a typo in the config file gets
/// the same "did you mean" message as one on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content hash algorithm name.
    pub hash_type: String,
    /// Bytes compared at each end of a file.
    pub partial_window: u64,
    /// Run the full-content hash stage.
    pub hash_enabled: bool,
    /// Run byte-for-byte verification.
    pub verify_enabled: bool,
    /// Worker threads; `None` means one per CPU.
    pub workers: Option<usize>,
    /// Read buffer size for hashing.
    pub block_size: usize,
    /// Chunk size for byte comparison.
    pub chunk_size: usize,
    /// Include hidden files and directories.
    pub include_hidden: bool,
    /// Follow symbolic links.
    pub follow_symlinks: bool,
    /// Skip unreadable entries instead of aborting.
    pub skip_inaccessible: bool,
    /// Gitignore-style exclude patterns.
    pub exclude: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hash_type: HashAlgorithm::default().name().to_string(),
            partial_window: DEFAULT_PARTIAL_WINDOW,
            hash_enabled: true,
            verify_enabled: true,
            workers: None,
            block_size: DEFAULT_BLOCK_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            include_hidden: false,
            follow_symlinks: false,
            skip_inaccessible: false,
            exclude: Vec::new(),
        }
    }
}

impl Config {
    /// Load defaults, the config file and environment overrides.
    ///
    /// With `explicit = None` the platform default path is used and a
    /// missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] if an explicit path does not exist,
    /// or [`ConfigError::Load`] if the file or environment cannot be parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::MissingFile(path.to_path_buf()));
                }
                Some(path.to_path_buf())
            }
            None => Self::default_path(),
        };

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(ref path) = path {
            log::debug!("Reading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Load defaults and a single TOML file, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] if the file does not exist, or
    /// [`ConfigError::Load`] if it cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::MissingFile(path.to_path_buf()));
        }
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dupefind").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply command-line flags on top of the loaded configuration.
    ///
    /// Switches only ever turn a behaviour on (or, for `--no-hash` and
    /// `--no-verify`, a stage off); exclude patterns are appended.
    pub fn apply_overrides(&mut self, args: &ScanArgs) {
        if let Some(algorithm) = args.hash_type {
            self.hash_type = algorithm.name().to_string();
        }
        if let Some(window) = args.partial_window {
            self.partial_window = window;
        }
        if let Some(workers) = args.workers {
            self.workers = Some(workers);
        }
        if args.no_hash {
            self.hash_enabled = false;
        }
        if args.no_verify {
            self.verify_enabled = false;
        }
        self.include_hidden |= args.include_hidden;
        self.follow_symlinks |= args.follow_symlinks;
        self.skip_inaccessible |= args.skip_inaccessible;
        self.exclude.extend(args.exclude.iter().cloned());
    }

    /// Build and validate the finder configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unknown hash algorithm or a zero
    /// window, worker count, block size or chunk size.
    pub fn finder_config(&self) -> Result<FinderConfig, ConfigError> {
        let algorithm: HashAlgorithm = self.hash_type.parse()?;

        let config = FinderConfig::default()
            .with_hash_algorithm(algorithm)
            .with_partial_window(self.partial_window)
            .with_hash(self.hash_enabled)
            .with_verify(self.verify_enabled)
            .with_workers(self.workers.unwrap_or_else(default_workers))
            .with_block_size(self.block_size)
            .with_chunk_size(self.chunk_size)
            .with_walker_config(WalkerConfig::new(
                self.include_hidden,
                self.follow_symlinks,
                self.skip_inaccessible,
                self.exclude.clone(),
            ));

        config.validate()?;
        Ok(config)
    }
}
