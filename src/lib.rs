//! # konpeito-cache
//!
//! The incremental compilation cache of the Konpeito toolchain. It decides,
//! for every source file, whether previously produced compiler artifacts
//! (parsed syntax trees, inferred type information) can be reused, and it
//! propagates invalidation through the file dependency graph when sources
//! change.
//!
//! ## Overview
//!
//! Validity is decided by content alone: every artifact is stored together
//! with the BLAKE3 fingerprint of the file it was computed from, and is served
//! only while the file still hashes to that fingerprint. Modification times
//! are never consulted.
//!
//! ## Key Features
//!
//! - **Content-based staleness**: BLAKE3 fingerprints, recomputed on every
//!   query
//! - **Transitive invalidation**: evicting a file evicts everything that
//!   depends on it
//! - **Dependency-respecting recompile order**: cycle tolerant and
//!   deterministic
//! - **Atomic persistence**: the manifest is an rkyv archive replaced by
//!   rename
//! - **Shared between workers**: every operation takes `&self`
//!
//! ## Architecture
//!
//! - [`cache`]: The [`CacheManager`] facade and its configuration
//! - [`graph`]: The file dependency graph
//! - [`index`]: The in-memory artifact table
//! - [`manifest`]: The on-disk snapshot of index and graph
//! - [`hashing`]: BLAKE3 file fingerprints
//! - [`path`]: Source file identity and path normalization
//! - [`value`]: Opaque artifact payloads
//! - [`error`]: Error types with thiserror + miette
//! - [`cli`] and [`commands`]: The `konpeito-cache` maintenance tool
//!
//! ## Library Usage
//!
//! ```no_run
//! use konpeito_cache::{CacheConfig, CacheManager, Value};
//!
//! let cache = CacheManager::open(CacheConfig::new(".konpeito_cache")?);
//!
//! if cache.needs_recompile("lib/util.rb")? {
//!     let ast = Value::hash([("type", Value::symbol("program"))]);
//!     cache.put_ast("lib/util.rb", ast)?;
//! }
//! cache.add_dependency("main.rb", "lib/util.rb")?;
//!
//! // A file watcher reported a change
//! cache.invalidate("lib/util.rb")?;
//! for file in cache.recompile_order(["lib/util.rb"])? {
//!     println!("recompile {file}");
//! }
//!
//! cache.save_manifest()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Stale artifacts and dependency cycles are ordinary results, not errors.
//! Unreadable source files and unwritable cache directories are returned to
//! the caller as [`error::CacheError`]. A corrupt manifest is discarded when
//! the cache is opened.

pub mod cache;
pub mod cli;
pub mod commands;
pub mod error;
pub mod graph;
pub mod hashing;
pub mod index;
pub mod manifest;
pub mod path;
pub mod value;

// Internal modules
mod logging;

pub use cache::{CacheConfig, CacheManager, CacheStats, ChangeSet};
pub use graph::DependencyGraph;
pub use hashing::Fingerprint;
pub use index::ArtifactKind;
pub use path::SourcePath;
pub use value::Value;
