//! Streaming content hasher.
//!
//! # Overview
//! [`Hasher`] computes a full-content digest of a file with one of the
//! supported [`HashAlgorithm`]s, reading through a fixed-size buffer so
//! memory use does not depend on file size.
//!
//! The [`FileHasher`] trait is the seam used by the duplicate finder; tests
//! can substitute their own implementation (for example one that produces
//! deliberate collisions).

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use sha2::Digest;

use super::FileError;
use crate::error::ConfigError;

/// Default read block size for full-content hashing (4 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Supported content hash algorithms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, clap::ValueEnum,
)]
pub enum HashAlgorithm {
    /// MD5 (fast, not collision resistant)
    #[value(name = "md5")]
    Md5,
    /// SHA-1
    #[value(name = "sha1")]
    Sha1,
    /// SHA-256
    #[value(name = "sha256")]
    Sha256,
    /// SHA-512
    #[value(name = "sha512")]
    Sha512,
    /// BLAKE3
    #[default]
    #[value(name = "blake3")]
    Blake3,
}

impl HashAlgorithm {
    /// All supported algorithms.
    pub const ALL: [HashAlgorithm; 5] = [
        Self::Md5,
        Self::Sha1,
        Self::Sha256,
        Self::Sha512,
        Self::Blake3,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }

    fn start(self) -> DigestState {
        match self {
            Self::Md5 => DigestState::Md5(md5::Context::new()),
            Self::Sha1 => DigestState::Sha1(sha1::Sha1::new()),
            Self::Sha256 => DigestState::Sha256(sha2::Sha256::new()),
            Self::Sha512 => DigestState::Sha512(sha2::Sha512::new()),
            Self::Blake3 => DigestState::Blake3(Box::new(blake3::Hasher::new())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            "blake3" | "b3" => Ok(Self::Blake3),
            _ => Err(ConfigError::UnknownHashAlgorithm {
                name: s.to_string(),
                suggestion: closest_name(&normalized),
            }),
        }
    }
}

/// Nearest supported name within a small edit distance.
fn closest_name(input: &str) -> Option<String> {
    HashAlgorithm::ALL
        .iter()
        .map(|alg| (strsim::levenshtein(input, alg.name()), alg.name()))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, name)| name.to_string())
}

/// In-progress digest for one of the supported algorithms.
enum DigestState {
    Md5(md5::Context),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(ctx) => ctx.consume(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finish(self) -> String {
        match self {
            Self::Md5(ctx) => format!("{:x}", ctx.compute()),
            Self::Sha1(h) => hex::encode(h.finalize()),
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Algorithm-tagged content digest.
///
/// Displays as `<algorithm>:<hex>`. Equal digests are a strong hint, never
/// proof, that two files are identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashDigest {
    algorithm: HashAlgorithm,
    hex: String,
}

impl HashDigest {
    /// Build a digest from an algorithm and its lowercase hex output.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, hex: impl Into<String>) -> Self {
        Self {
            algorithm,
            hex: hex.into(),
        }
    }

    /// The algorithm that produced this digest.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Lowercase hex encoding of the digest bytes.
    #[must_use]
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

/// Computes full-content digests of files.
pub trait FileHasher: Send + Sync {
    /// The algorithm whose digests this hasher produces.
    fn algorithm(&self) -> HashAlgorithm;

    /// Hash the entire content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] if the file cannot be opened or read.
    fn hash_file(&self, path: &Path) -> Result<HashDigest, FileError>;
}

/// Streaming file hasher.
///
/// # Example
///
/// ```no_run
/// use dupefind::scanner::{HashAlgorithm, Hasher};
/// use std::path::Path;
///
/// let hasher = Hasher::new(HashAlgorithm::Sha256);
/// let digest = hasher.full_hash(Path::new("file.bin")).unwrap();
/// println!("{digest}");
/// ```
#[derive(Debug, Clone)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    block_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

impl Hasher {
    /// Create a hasher with the default 4 MiB read block.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Set the read block size. Zero is treated as one byte.
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// The configured read block size.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Digest an in-memory buffer.
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> HashDigest {
        let mut state = self.algorithm.start();
        state.update(data);
        HashDigest::new(self.algorithm, state.finish())
    }

    /// Digest everything `reader` yields, one block at a time.
    ///
    /// # Errors
    ///
    /// Propagates any read error other than `Interrupted`.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<HashDigest> {
        let mut state = self.algorithm.start();
        let mut buffer = vec![0u8; self.block_size];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => state.update(&buffer[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(HashDigest::new(self.algorithm, state.finish()))
    }

    /// Digest the entire content of a file.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] if the file cannot be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<HashDigest, FileError> {
        let file = File::open(path).map_err(|e| FileError::from_io(path, e))?;
        self.hash_reader(file)
            .map_err(|e| FileError::from_io(path, e))
    }
}

impl FileHasher for Hasher {
    fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn hash_file(&self, path: &Path) -> Result<HashDigest, FileError> {
        self.full_hash(path)
    }
}
