//! Streaming content fingerprints.
//!
//! # Overview
//!
//! This module provides the [`Hasher`] struct for computing a fixed-width
//! [`Hash`] of a file's contents. Files are streamed in fixed-size chunks,
//! so a file never has to fit in memory, and every byte is read exactly once.
//!
//! Two algorithms are available:
//!
//! - [`Algorithm::Blake3`] (default): cryptographic, collision-resistant.
//! - [`Algorithm::Legacy`]: the two-accumulator rolling checksum from
//!   [`super::checksum`]. Fast but weak, so callers must confirm matches with
//!   a byte comparison before acting on them.
//!
//! # Example
//!
//! ```no_run
//! use dupelink::scanner::{hash_to_hex, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let digest = hasher.full_hash(Path::new("notes.txt")).unwrap();
//! println!("{}", hash_to_hex(&digest));
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::checksum::RollingChecksum;
use super::HashError;

/// A 32-byte content digest.
pub type Hash = [u8; 32];

/// Read buffer size for streaming (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Fingerprint algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// BLAKE3 digest.
    #[default]
    Blake3,
    /// djb2/sdbm rolling checksum. Requires byte verification.
    Legacy,
}

impl Algorithm {
    /// Whether a digest match from this algorithm can be trusted without
    /// comparing the file contents.
    #[must_use]
    pub fn is_collision_resistant(self) -> bool {
        matches!(self, Self::Blake3)
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blake3 => write!(f, "blake3"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

/// Streaming file hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    algorithm: Algorithm,
    chunk_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a BLAKE3 hasher with the default chunk size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            algorithm: Algorithm::Blake3,
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Select the fingerprint algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Override the read chunk size. Zero is clamped to one byte.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// The configured algorithm.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Hash the entire contents of a file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or a read fails
    /// mid-stream. The file handle is closed on every path.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        self.hash_reader(file)
            .map_err(|e| HashError::from_io(path, e))
    }

    /// Hash everything a reader yields until EOF.
    ///
    /// # Errors
    ///
    /// Propagates any read error other than `Interrupted`.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<Hash> {
        let mut buffer = vec![0u8; self.chunk_size];

        match self.algorithm {
            Algorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                loop {
                    let n = read_chunk(&mut reader, &mut buffer)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buffer[..n]);
                }
                Ok(*hasher.finalize().as_bytes())
            }
            Algorithm::Legacy => {
                let mut checksum = RollingChecksum::new();
                loop {
                    let n = read_chunk(&mut reader, &mut buffer)?;
                    if n == 0 {
                        break;
                    }
                    checksum.update(&buffer[..n]);
                }
                Ok(checksum.digest())
            }
        }
    }
}

fn read_chunk<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buffer) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Convenience wrapper: fingerprint a file with the given algorithm.
///
/// # Errors
///
/// See [`Hasher::full_hash`].
pub fn fingerprint(path: &Path, algorithm: Algorithm) -> Result<Hash, HashError> {
    Hasher::new().with_algorithm(algorithm).full_hash(path)
}

/// Render a digest as 64 lowercase hex characters.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    use std::fmt::Write;
    hash.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// Parse a 64-character hex string back into a digest.
///
/// Returns `None` on wrong length or non-hex input.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    if hex.len() != 64 || !hex.is_ascii() {
        return None;
    }
    let mut hash = [0u8; 32];
    for (i, byte) in hash.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(hash)
}
