//! The cache facade.
//!
//! [`CacheManager`] owns one [`ArtifactIndex`], one [`DependencyGraph`] and the
//! manifest location for its configured directory. It answers staleness
//! queries, stores and serves artifacts, propagates invalidation through the
//! graph, computes recompile orders, and manages the manifest lifecycle.
//!
//! All methods take `&self`, so one manager can be shared by many compilation
//! workers behind an `Arc`. Mutations are serialized by a write lock; reads
//! share a read lock and never see a half-applied mutation. Files are hashed
//! before any lock is taken.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::hashing::{Fingerprint, hash_file, hash_files};
use crate::index::{ArtifactIndex, ArtifactKind, StoredArtifact};
use crate::logging::Logger;
use crate::manifest::{ManifestData, clean_manifest, load_manifest, save_manifest};
use crate::path::SourcePath;
use crate::value::Value;

mod changes;
mod config;

pub use changes::ChangeSet;
pub use config::{CacheConfig, CacheConfigBuilder, DEFAULT_CACHE_DIR};


/// Summary of what a cache currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Files with at least one stored artifact.
    pub cached_files: usize,
    /// Stored artifacts across all files and kinds.
    pub artifacts: usize,
    /// Recorded dependency edges.
    pub dependency_edges: usize,
    /// Files taking part in at least one edge.
    pub graph_files: usize,
    /// Size of the persisted manifest, if one exists.
    pub manifest_bytes: Option<u64>,
}

#[derive(Debug, Default)]
struct CacheState {
    index: ArtifactIndex,
    graph: DependencyGraph,
}

/// Incremental compilation cache for one cache directory.
#[derive(Debug)]
pub struct CacheManager {
    config: CacheConfig,
    manifest_path: PathBuf,
    log: Logger,
    state: RwLock<CacheState>,
}

impl CacheManager {
    /// Opens the cache in `config.cache_dir()`.
    ///
    /// An existing manifest is loaded eagerly. A missing, corrupt or
    /// incompatible manifest never fails construction; the cache simply
    /// starts cold.
    pub fn open(config: CacheConfig) -> Self {
        let log = Logger::new(config.verbose(), config.quiet());
        let manifest_path = config.manifest_path();

        let manifest = load_manifest(&manifest_path, config.toolchain_version(), &log);
        let state = match manifest.restore(&log) {
            Ok((index, graph)) => {
                log.verbose(
                    1,
                    format!(
                        "Loaded cache manifest from {}: {} file(s), {} dependency edge(s)",
                        manifest_path.display(),
                        index.len(),
                        graph.edge_count()
                    ),
                );
                CacheState { index, graph }
            }
            Err(err) => {
                log.warn(format!(
                    "Cache manifest at {} is inconsistent ({err}); starting with a cold cache",
                    manifest_path.display()
                ));
                CacheState::default()
            }
        };

        Self {
            config,
            manifest_path,
            log,
            state: RwLock::new(state),
        }
    }

    /// The configuration this cache was opened with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Fingerprint of the file's current content.
    pub fn file_hash(&self, path: impl AsRef<Path>) -> Result<Fingerprint> {
        let path = SourcePath::new(path)?;
        hash_file(path.as_path())
    }

    /// `true` unless a valid AST is stored for the file's current content.
    pub fn needs_recompile(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = SourcePath::new(path)?;
        let current = hash_file(path.as_path())?;

        let state = self.read();
        let fresh = state
            .index
            .get(&path, ArtifactKind::Ast)
            .is_some_and(|stored| stored.fingerprint == current);
        Ok(!fresh)
    }

    /// Stores a payload against the file's current content, replacing any
    /// previous artifact of the same kind.
    pub fn put(&self, path: impl AsRef<Path>, kind: ArtifactKind, value: Value) -> Result<()> {
        let path = SourcePath::new(path)?;
        let fingerprint = hash_file(path.as_path())?;

        self.log
            .verbose(3, format!("Storing {kind} for {path} at {fingerprint}"));
        self.write().index.insert(
            path,
            kind,
            StoredArtifact {
                fingerprint,
                payload: Arc::new(value),
            },
        );
        Ok(())
    }

    /// Returns the stored payload if it was computed from the file's current
    /// content.
    ///
    /// A stale entry reads as absent and is evicted, unless another worker
    /// replaced it in the meantime.
    pub fn get(&self, path: impl AsRef<Path>, kind: ArtifactKind) -> Result<Option<Arc<Value>>> {
        let path = SourcePath::new(path)?;
        let current = hash_file(path.as_path())?;

        let stale = {
            let state = self.read();
            match state.index.get(&path, kind) {
                None => return Ok(None),
                Some(stored) if stored.fingerprint == current => {
                    return Ok(Some(Arc::clone(&stored.payload)));
                }
                Some(stored) => stored.fingerprint.clone(),
            }
        };

        if self.write().index.evict_if_stale(&path, kind, &stale) {
            self.log
                .verbose(2, format!("Evicted stale {kind} for {path}"));
        }
        Ok(None)
    }

    /// Stores the parsed syntax tree for a file.
    pub fn put_ast(&self, path: impl AsRef<Path>, value: Value) -> Result<()> {
        self.put(path, ArtifactKind::Ast, value)
    }

    /// The parsed syntax tree, if still valid.
    pub fn get_ast(&self, path: impl AsRef<Path>) -> Result<Option<Arc<Value>>> {
        self.get(path, ArtifactKind::Ast)
    }

    /// Stores the inferred type information for a file.
    pub fn put_types(&self, path: impl AsRef<Path>, value: Value) -> Result<()> {
        self.put(path, ArtifactKind::Types, value)
    }

    /// The inferred type information, if still valid.
    pub fn get_types(&self, path: impl AsRef<Path>) -> Result<Option<Arc<Value>>> {
        self.get(path, ArtifactKind::Types)
    }

    /// Records that `dependent` requires `dependency`. Idempotent.
    pub fn add_dependency(
        &self,
        dependent: impl AsRef<Path>,
        dependency: impl AsRef<Path>,
    ) -> Result<()> {
        let dependent = SourcePath::new(dependent)?;
        let dependency = SourcePath::new(dependency)?;

        let mut state = self.write();
        if state.graph.add_dependency(dependent.clone(), dependency.clone()) {
            self.log
                .verbose(3, format!("Dependency recorded: {dependent} -> {dependency}"));
        }
        Ok(())
    }

    /// Forgets the recorded dependencies of a file, keeping its dependents.
    pub fn clear_dependencies(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = SourcePath::new(path)?;
        self.write().graph.clear_dependencies(&path);
        Ok(())
    }

    /// Direct dependencies of a file.
    pub fn dependencies(&self, path: impl AsRef<Path>) -> Result<BTreeSet<SourcePath>> {
        let path = SourcePath::new(path)?;
        Ok(self.read().graph.dependencies(&path))
    }

    /// Files that directly require a file.
    pub fn dependents(&self, path: impl AsRef<Path>) -> Result<BTreeSet<SourcePath>> {
        let path = SourcePath::new(path)?;
        Ok(self.read().graph.direct_dependents(&path))
    }

    /// Files that transitively require a file.
    pub fn all_dependents(&self, path: impl AsRef<Path>) -> Result<BTreeSet<SourcePath>> {
        let path = SourcePath::new(path)?;
        Ok(self.read().graph.all_dependents(&path))
    }

    /// `true` if the file has at least one recorded dependency.
    pub fn has_dependencies(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = SourcePath::new(path)?;
        Ok(self.read().graph.has_dependencies(&path))
    }

    /// Drops everything known about a deleted source file: its artifacts and
    /// every edge touching it.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = SourcePath::new(path)?;

        let mut state = self.write();
        state.index.evict_all(&path);
        state.graph.remove(&path);
        self.log.verbose(2, format!("Removed {path} from the cache"));
        Ok(())
    }

    /// Evicts every artifact of a file and of all its transitive dependents.
    ///
    /// Dependents are evicted whether or not their own content changed.
    /// Returns the affected files, including `path` itself.
    pub fn invalidate(&self, path: impl AsRef<Path>) -> Result<BTreeSet<SourcePath>> {
        let path = SourcePath::new(path)?;

        let mut state = self.write();
        let mut affected = state.graph.all_dependents(&path);
        affected.insert(path.clone());

        let evicted = affected
            .iter()
            .filter(|file| state.index.evict_all(file))
            .count();

        self.log.verbose(
            2,
            format!(
                "Invalidated {path}: {} affected file(s), {evicted} with stored artifacts",
                affected.len()
            ),
        );
        Ok(affected)
    }

    /// Recompile order for `seeds` and all their transitive dependents:
    /// every dependency precedes its dependents.
    ///
    /// The cache only reports the order; it does not enforce it.
    pub fn recompile_order<I, P>(&self, seeds: I) -> Result<Vec<SourcePath>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let seeds = seeds
            .into_iter()
            .map(SourcePath::new)
            .collect::<Result<Vec<_>>>()?;

        let state = self.read();
        let ordering = state.graph.ordering(&seeds);
        if !ordering.cycle_breaks.is_empty() {
            self.log.verbose(
                1,
                format!(
                    "Dependency cycle detected; broke it at: {}",
                    ordering
                        .cycle_breaks
                        .iter()
                        .map(SourcePath::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            );
        }
        Ok(ordering.files)
    }

    /// Classifies `paths` by whether their stored AST is still valid.
    ///
    /// Files are hashed in parallel before the cache is consulted. Unreadable
    /// files are reported as missing rather than failing the whole batch.
    pub fn detect_changes<I, P>(&self, paths: I) -> Result<ChangeSet>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths = paths
            .into_iter()
            .map(SourcePath::new)
            .collect::<Result<Vec<_>>>()?;
        let hashes = hash_files(&paths);

        let state = self.read();
        let mut changes = ChangeSet::default();
        for (path, hash) in hashes {
            let Ok(current) = hash else {
                changes.missing_files.push(path);
                continue;
            };
            match state.index.get(&path, ArtifactKind::Ast) {
                None => changes.new_files.push(path),
                Some(stored) if stored.fingerprint == current => {
                    changes.unchanged_files.push(path)
                }
                Some(_) => changes.modified_files.push(path),
            }
        }
        changes.sort();
        Ok(changes)
    }

    /// Persists all artifacts and dependency edges, atomically replacing any
    /// previous manifest.
    pub fn save_manifest(&self) -> Result<()> {
        let state = self.write();
        let manifest =
            ManifestData::capture(self.config.toolchain_version(), &state.index, &state.graph);
        save_manifest(&manifest, &self.manifest_path)?;

        self.log.verbose(
            1,
            format!(
                "Saved cache manifest to {}: {} file(s), {} dependency edge(s)",
                self.manifest_path.display(),
                manifest.len(),
                state.graph.edge_count()
            ),
        );
        Ok(())
    }

    /// `true` if a manifest has been saved to the cache directory.
    pub fn cache_exists(&self) -> bool {
        self.manifest_path.is_file()
    }

    /// Discards all in-memory and persisted state.
    pub fn clean(&self) -> Result<()> {
        let mut state = self.write();
        state.index.clear();
        state.graph.clear();
        clean_manifest(&self.manifest_path)?;

        self.log.verbose(
            1,
            format!("Cleaned cache at {}", self.config.cache_dir().display()),
        );
        Ok(())
    }

    /// Every file currently holding at least one artifact.
    pub fn cached_files(&self) -> BTreeSet<SourcePath> {
        self.read().index.files()
    }

    /// Counts of what the cache holds.
    pub fn stats(&self) -> CacheStats {
        let state = self.read();
        CacheStats {
            cached_files: state.index.len(),
            artifacts: state.index.artifact_count(),
            dependency_edges: state.graph.edge_count(),
            graph_files: state.graph.all_files().len(),
            manifest_bytes: std::fs::metadata(&self.manifest_path)
                .ok()
                .filter(|metadata| metadata.is_file())
                .map(|metadata| metadata.len()),
        }
    }

    // Every mutation leaves the index and graph consistent before anything
    // that could panic, so a poisoned lock still guards valid state.
    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
