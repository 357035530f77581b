//! Error types for konpeito-cache.
//!
//! This module defines all error types used throughout the cache, using
//! a combination of `thiserror` for ergonomic error definitions and `miette`
//! for rich diagnostic output.
//!
//! # Error Handling Strategy
//!
//! - All errors derive from [`CacheError`]
//! - A stale artifact is not an error: it is reported as an absent value
//! - A dependency cycle is not an error: ordering breaks it deterministically
//! - Unreadable source files and unwritable cache directories are surfaced to
//!   the caller
//! - An unreadable manifest is absorbed at construction and treated as a cold
//!   cache
//!
//! # Example
//!
//! ```no_run
//! use konpeito_cache::error::{CacheError, Result};
//!
//! fn require_name(name: &str) -> Result<()> {
//!     if name.is_empty() {
//!         return Err(CacheError::InvalidPath {
//!             message: "source path must not be empty".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error types that can occur in cache operations
#[derive(Error, Debug, Diagnostic)]
pub enum CacheError {
    /// File system I/O error while hashing a source file or touching the
    /// manifest.
    ///
    /// Common causes: the source file was deleted between discovery and
    /// hashing, permission denied, disk full, or memory mapping failures.
    #[error("I/O error accessing '{path}'")]
    #[diagnostic(code(konpeito_cache::io_error))]
    IoError {
        /// The path that caused the I/O error
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A path handed to the cache cannot identify a source file.
    ///
    /// Raised before any normalization happens, e.g. for an empty string,
    /// so that a bad path never silently aliases the current directory.
    #[error("Invalid path: {message}")]
    #[diagnostic(
        code(konpeito_cache::path::invalid),
        help("Pass the path of a source file, relative to the working directory or absolute.")
    )]
    InvalidPath {
        /// Description of why the path is invalid
        message: String,
    },

    /// A path cannot be represented as UTF-8 for storage in the manifest.
    #[error("Invalid UTF-8 in path: {0}")]
    #[diagnostic(
        code(konpeito_cache::path::invalid_utf8),
        help("Source file paths must be valid UTF-8 to be recorded in the cache manifest.")
    )]
    InvalidUtf8Path(
        /// The path containing invalid UTF-8
        PathBuf,
    ),

    /// Attempted to fingerprint something that is not a regular file.
    #[error("Invalid file type for '{0}': {1}")]
    #[diagnostic(
        code(konpeito_cache::file::invalid_type),
        help("Only regular source files can be fingerprinted.")
    )]
    InvalidFileType(
        /// The path of the invalid file
        PathBuf,
        /// Description of the file type issue
        String,
    ),

    /// Failed to create the cache directory before writing the manifest.
    #[error("Failed to create cache directory '{0}'")]
    #[diagnostic(
        code(konpeito_cache::manifest::create_dir_error),
        help("Ensure you have write permissions for the parent directory.")
    )]
    CreateCacheDirError(
        /// The directory path that couldn't be created
        PathBuf,
        /// The underlying I/O error
        #[source]
        std::io::Error,
    ),

    /// Failed to serialize the manifest to rkyv format.
    #[error("Failed to serialize cache manifest")]
    #[diagnostic(
        code(konpeito_cache::manifest::serialization_error),
        help(
            "An internal error occurred while saving the manifest. Run 'konpeito-cache clean' to \
             start from a cold cache."
        )
    )]
    SerializationError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Failed to deserialize the manifest from rkyv format.
    ///
    /// Never escapes cache construction: the manifest is discarded and the
    /// cache starts cold.
    #[error("Failed to deserialize cache manifest: {0}")]
    #[diagnostic(
        code(konpeito_cache::manifest::deserialization_error),
        help("The manifest may be corrupted. Run 'konpeito-cache clean' to reset it.")
    )]
    DeserializationError(
        /// The underlying deserialization error
        #[source]
        rkyv::rancor::BoxedError,
    ),

    /// The manifest was written by an incompatible format or toolchain
    /// version.
    #[error("Incompatible cache manifest: found {found}, expected {expected}")]
    #[diagnostic(
        code(konpeito_cache::manifest::incompatible),
        help("The cache will be rebuilt from scratch on the next save.")
    )]
    IncompatibleManifest {
        /// Version found on disk
        found: String,
        /// Version this build understands
        expected: String,
    },

    /// Required configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(konpeito_cache::config::error),
        help("Check the required configuration parameters.")
    )]
    ConfigError(
        /// Description of the configuration error
        String,
    ),
}

/// Type alias for Results in this crate
pub type Result<T> = std::result::Result<T, CacheError>;
