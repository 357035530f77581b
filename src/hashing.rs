//! Content fingerprints.
//!
//! A [`Fingerprint`] is the lowercase hex BLAKE3 digest of a file's bytes and
//! is the only thing the cache consults to decide whether a stored artifact
//! is still valid. Nothing here is memoized: every call re-reads the file.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use blake3::Hasher;
use rayon::prelude::*;

use crate::error::{CacheError, Result};
use crate::path::SourcePath;


/// Length of a fingerprint in hex characters (256-bit digest).
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Inputs at least this large are hashed with BLAKE3's rayon backend.
const PARALLEL_HASH_THRESHOLD: u64 = 128 * 1024;

/// Hex-encoded BLAKE3 digest of a file's content.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprints an in-memory byte slice.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// Parses a stored fingerprint, accepting only 64 lowercase hex digits.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let valid = hex.len() == FINGERPRINT_HEX_LEN
            && hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(hex.to_string()))
    }

    /// The digest as lowercase hex.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the BLAKE3 fingerprint of a file's current content.
///
/// Small files are streamed through the hasher; large files are read into
/// memory and hashed with BLAKE3's built-in parallelism. Symbolic links are
/// followed, since source trees commonly link shared files in.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be opened or read
/// - The path points to a directory
pub fn hash_file(path: &Path) -> Result<Fingerprint> {
    let io_error = |source| CacheError::IoError {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_error)?;
    let metadata = file.metadata().map_err(io_error)?;

    if metadata.is_dir() {
        return Err(CacheError::InvalidFileType(
            path.to_path_buf(),
            "Directories cannot be fingerprinted".to_string(),
        ));
    }

    let mut hasher = Hasher::new();
    if metadata.len() >= PARALLEL_HASH_THRESHOLD {
        // The length is a hint only; the file may change while it is read.
        let mut content = Vec::with_capacity(usize::try_from(metadata.len()).unwrap_or(0));
        file.read_to_end(&mut content).map_err(io_error)?;
        hasher.update_rayon(&content);
    } else {
        hasher.update_reader(&file).map_err(io_error)?;
    }

    Ok(Fingerprint(hasher.finalize().to_hex().to_string()))
}

/// Fingerprints many files in parallel.
///
/// Results are returned in input order; a failure for one file does not
/// affect the others.
pub fn hash_files(paths: &[SourcePath]) -> Vec<(SourcePath, Result<Fingerprint>)> {
    paths
        .par_iter()
        .map(|path| (path.clone(), hash_file(path.as_path())))
        .collect()
}
