//! In-memory artifact table.
//!
//! Maps (source file, artifact kind) to a payload and the fingerprint of the
//! file content it was computed from. Validity is decided by the caller, who
//! compares that fingerprint against a fresh one.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use rkyv::{Archive, Deserialize, Serialize};

use crate::hashing::Fingerprint;
use crate::path::SourcePath;
use crate::value::Value;

#[cfg(test)]
mod tests;

/// Kind of compiler output stored for a file.
#[derive(
    Archive, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum ArtifactKind {
    /// Parsed syntax tree.
    Ast,
    /// Inferred type information.
    Types,
}

impl ArtifactKind {
    /// All kinds, in storage order.
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Ast, ArtifactKind::Types];

    /// Short lowercase name, as used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Ast => "ast",
            ArtifactKind::Types => "types",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload tagged with the fingerprint it was stored against.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArtifact {
    /// Fingerprint of the file content when the payload was stored.
    pub fingerprint: Fingerprint,
    /// The opaque payload.
    pub payload: Arc<Value>,
}

/// Artifact table keyed by normalized path and kind.
#[derive(Debug, Clone, Default)]
pub struct ArtifactIndex {
    files: HashMap<SourcePath, BTreeMap<ArtifactKind, StoredArtifact>>,
}

impl ArtifactIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `artifact`, replacing any previous entry for (`path`, `kind`).
    pub fn insert(&mut self, path: SourcePath, kind: ArtifactKind, artifact: StoredArtifact) {
        self.files.entry(path).or_default().insert(kind, artifact);
    }

    /// The stored entry for (`path`, `kind`), valid or not.
    pub fn get(&self, path: &SourcePath, kind: ArtifactKind) -> Option<&StoredArtifact> {
        self.files.get(path)?.get(&kind)
    }

    /// Removes the entry for (`path`, `kind`).
    pub fn evict(&mut self, path: &SourcePath, kind: ArtifactKind) -> Option<StoredArtifact> {
        let artifacts = self.files.get_mut(path)?;
        let removed = artifacts.remove(&kind);
        if artifacts.is_empty() {
            self.files.remove(path);
        }
        removed
    }

    /// Removes the entry for (`path`, `kind`) only if it still carries
    /// `fingerprint`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn evict_if_stale(
        &mut self,
        path: &SourcePath,
        kind: ArtifactKind,
        fingerprint: &Fingerprint,
    ) -> bool {
        let matches = self
            .get(path, kind)
            .is_some_and(|stored| stored.fingerprint == *fingerprint);
        matches && self.evict(path, kind).is_some()
    }

    /// Removes every kind stored for `path`.
    ///
    /// Returns `true` if anything was stored.
    pub fn evict_all(&mut self, path: &SourcePath) -> bool {
        self.files.remove(path).is_some()
    }

    /// Iterates over all stored entries.
    pub fn iter(&self) -> impl Iterator<Item = (&SourcePath, ArtifactKind, &StoredArtifact)> {
        self.files.iter().flat_map(|(path, artifacts)| {
            artifacts
                .iter()
                .map(move |(kind, artifact)| (path, *kind, artifact))
        })
    }

    /// Every file holding at least one artifact.
    pub fn files(&self) -> BTreeSet<SourcePath> {
        self.files.keys().cloned().collect()
    }

    /// `true` if any artifact is stored for `path`.
    pub fn contains(&self, path: &SourcePath) -> bool {
        self.files.contains_key(path)
    }

    /// Number of files with at least one artifact.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Total number of stored artifacts across all files and kinds.
    pub fn artifact_count(&self) -> usize {
        self.files.values().map(BTreeMap::len).sum()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.files.clear();
    }
}
