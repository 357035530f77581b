//! Durable manifest: the on-disk snapshot of the artifact index and the
//! dependency graph.
//!
//! The manifest is a single rkyv archive at `<cache_dir>/manifest.bin`. Loads
//! are memory mapped and fail safe (a missing, empty, corrupt or incompatible
//! manifest is a cold cache). Saves are atomic: the archive is written to a
//! temporary file in the same directory and renamed over the old one.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use memmap2::Mmap;
use rkyv::{Archive, Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::graph::{DependencyGraph, DependencySnapshot};
use crate::hashing::Fingerprint;
use crate::index::{ArtifactIndex, ArtifactKind, StoredArtifact};
use crate::logging::Logger;
use crate::path::SourcePath;
use crate::value::Value;

#[cfg(test)]
mod tests;

/// Current version of the manifest format.
///
/// Incremented whenever the archived layout changes. A manifest with any
/// other version is treated as a cold cache.
pub const MANIFEST_VERSION: u32 = 1;

/// Name of the manifest file within the cache directory.
pub const MANIFEST_FILE: &str = "manifest.bin";

/// Distinguishes temporary files written by concurrent saves in one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One stored artifact as persisted.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ArtifactRecord {
    /// Which artifact this is.
    pub kind: ArtifactKind,
    /// Hex fingerprint of the file content the payload was computed from.
    pub fingerprint: String,
    /// The opaque payload.
    pub payload: Value,
}

/// Everything persisted for one source file.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct FileRecord {
    /// Stored artifacts, at most one per kind.
    pub artifacts: Vec<ArtifactRecord>,
}

/// The archived manifest.
#[derive(Archive, Deserialize, Serialize, Debug, Clone)]
pub struct ManifestData {
    /// Manifest format version.
    pub version: u32,

    /// Version of the toolchain whose parser and inferencer produced the
    /// payloads.
    pub toolchain_version: String,

    /// Artifacts keyed by normalized path.
    pub files: HashMap<String, FileRecord>,

    /// Forward dependency edges keyed by normalized dependent path.
    pub dependencies: DependencySnapshot,
}

impl ManifestData {
    /// Creates an empty manifest for `toolchain_version`.
    pub fn new(toolchain_version: &str) -> Self {
        Self {
            version: MANIFEST_VERSION,
            toolchain_version: toolchain_version.to_string(),
            files: HashMap::new(),
            dependencies: DependencySnapshot::new(),
        }
    }

    /// Captures the in-memory state.
    pub fn capture(toolchain_version: &str, index: &ArtifactIndex, graph: &DependencyGraph) -> Self {
        let mut manifest = Self::new(toolchain_version);
        for (path, kind, artifact) in index.iter() {
            manifest
                .files
                .entry(path.as_str().to_string())
                .or_default()
                .artifacts
                .push(ArtifactRecord {
                    kind,
                    fingerprint: artifact.fingerprint.as_str().to_string(),
                    payload: Value::clone(&artifact.payload),
                });
        }
        manifest.dependencies = graph.to_snapshot();
        manifest
    }

    /// Rebuilds the in-memory state.
    ///
    /// Artifacts whose stored fingerprint is malformed are dropped (they could
    /// never validate). A malformed path fails the whole restore.
    pub fn restore(self, log: &Logger) -> Result<(ArtifactIndex, DependencyGraph)> {
        let mut index = ArtifactIndex::new();
        let mut dropped = 0usize;

        for (path, record) in self.files {
            let path = SourcePath::new(&path)?;
            for artifact in record.artifacts {
                let Some(fingerprint) = Fingerprint::from_hex(&artifact.fingerprint) else {
                    dropped += 1;
                    continue;
                };
                index.insert(
                    path.clone(),
                    artifact.kind,
                    StoredArtifact {
                        fingerprint,
                        payload: Arc::new(artifact.payload),
                    },
                );
            }
        }

        if dropped > 0 {
            log.warn(format!(
                "Dropped {dropped} manifest entr{} with a malformed fingerprint",
                if dropped == 1 { "y" } else { "ies" }
            ));
        }

        let graph = DependencyGraph::from_snapshot(&self.dependencies)?;
        Ok((index, graph))
    }

    /// Returns `true` if this manifest can be reused by `toolchain_version`.
    pub fn is_compatible(&self, toolchain_version: &str) -> bool {
        self.version == MANIFEST_VERSION && self.toolchain_version == toolchain_version
    }

    /// Number of files with stored artifacts.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if the manifest holds no artifacts and no edges.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dependencies.is_empty()
    }
}

/// Path of the manifest inside `cache_dir`.
pub fn manifest_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(MANIFEST_FILE)
}

/// Loads the manifest, falling back to a cold cache on any problem.
///
/// A missing or empty file is a normal cold start. A corrupt archive is
/// removed so the next run does not trip over it again. A manifest from
/// another format or toolchain version is ignored and overwritten by the next
/// save. None of these fail: the worst outcome is a full recompilation.
pub fn load_manifest(manifest_path: &Path, toolchain_version: &str, log: &Logger) -> ManifestData {
    let fresh = || ManifestData::new(toolchain_version);

    match load_manifest_inner(manifest_path) {
        Ok(None) => fresh(),
        Ok(Some(manifest)) if !manifest.is_compatible(toolchain_version) => {
            let err = CacheError::IncompatibleManifest {
                found: format!(
                    "format {} / toolchain {}",
                    manifest.version, manifest.toolchain_version
                ),
                expected: format!("format {MANIFEST_VERSION} / toolchain {toolchain_version}"),
            };
            log.warn(format!("{err}; starting with a cold cache"));
            fresh()
        }
        Ok(Some(manifest)) => manifest,
        Err(CacheError::DeserializationError(source)) => {
            log.warn(format!(
                "Cache manifest at {} is unreadable ({source}); starting with a cold cache",
                manifest_path.display()
            ));
            if let Err(remove_err) = fs::remove_file(manifest_path) {
                log.warn(format!("Could not remove corrupt manifest: {remove_err}"));
            }
            fresh()
        }
        Err(other) => {
            log.warn(format!("{other}; starting with a cold cache"));
            fresh()
        }
    }
}

/// Loads the manifest without any recovery. `Ok(None)` means there is none.
pub(crate) fn load_manifest_inner(manifest_path: &Path) -> Result<Option<ManifestData>> {
    if !manifest_path.exists() {
        return Ok(None);
    }

    let file = File::open(manifest_path).map_err(|source| CacheError::IoError {
        path: manifest_path.to_path_buf(),
        source,
    })?;

    let file_metadata = file.metadata().map_err(|source| CacheError::IoError {
        path: manifest_path.to_path_buf(),
        source,
    })?;

    if file_metadata.len() == 0 {
        return Ok(None);
    }

    // SAFETY: manifests are only ever replaced by rename, never written in
    // place, so the mapped file does not change underneath us.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|source| CacheError::IoError {
        path: manifest_path.to_path_buf(),
        source,
    })?;

    let manifest = rkyv::from_bytes::<ManifestData, rkyv::rancor::BoxedError>(&mmap[..])
        .map_err(CacheError::DeserializationError)?;

    Ok(Some(manifest))
}

/// Saves the manifest atomically.
///
/// Writes to a process-unique temporary file next to the manifest, syncs it,
/// then renames it over the final path, so readers see either the old or the
/// new manifest and never a partial one.
///
/// # Errors
///
/// Returns an error if:
/// - The cache directory cannot be created
/// - The manifest cannot be serialized
/// - The temporary file cannot be written or renamed
pub fn save_manifest(manifest: &ManifestData, manifest_path: &Path) -> Result<()> {
    if let Some(parent) = manifest_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| CacheError::CreateCacheDirError(parent.to_path_buf(), source))?;
    }

    let bytes = rkyv::to_bytes::<rkyv::rancor::BoxedError>(manifest)
        .map_err(|e| CacheError::SerializationError(Box::new(e)))?;

    let temp_path = temp_manifest_path(manifest_path);
    let result = write_and_rename(&bytes, &temp_path, manifest_path);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_and_rename(bytes: &[u8], temp_path: &Path, manifest_path: &Path) -> Result<()> {
    let mut temp_file = File::create(temp_path).map_err(|source| CacheError::IoError {
        path: temp_path.to_path_buf(),
        source,
    })?;

    temp_file
        .write_all(bytes)
        .map_err(|source| CacheError::IoError {
            path: temp_path.to_path_buf(),
            source,
        })?;

    temp_file.sync_all().map_err(|source| CacheError::IoError {
        path: temp_path.to_path_buf(),
        source,
    })?;

    fs::rename(temp_path, manifest_path).map_err(|source| CacheError::IoError {
        path: manifest_path.to_path_buf(),
        source,
    })
}

fn temp_manifest_path(manifest_path: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = manifest_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| MANIFEST_FILE.to_string());
    manifest_path.with_file_name(format!("{name}.{}.{n}.tmp", std::process::id()))
}

/// Removes the manifest and any temporary files left by interrupted saves.
///
/// Idempotent: succeeds when there is nothing to remove.
pub fn clean_manifest(manifest_path: &Path) -> Result<()> {
    if manifest_path.exists() {
        fs::remove_file(manifest_path).map_err(|source| CacheError::IoError {
            path: manifest_path.to_path_buf(),
            source,
        })?;
    }

    let (Some(dir), Some(name)) = (manifest_path.parent(), manifest_path.file_name()) else {
        return Ok(());
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return Ok(());
    };

    let prefix = format!("{}.", name.to_string_lossy());
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if file_name.starts_with(&prefix) && file_name.ends_with(".tmp") {
            fs::remove_file(entry.path()).map_err(|source| CacheError::IoError {
                path: entry.path(),
                source,
            })?;
        }
    }

    Ok(())
}
