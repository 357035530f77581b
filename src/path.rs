//! Source file identity.
//!
//! Every path handed to the cache is normalized once, up front, into a
//! [`SourcePath`]: absolute, free of `.` and `..` components, and valid UTF-8.
//! Two spellings of the same location (`./src/a.rb`, `src/../src/a.rb`,
//! `/work/src/a.rb`) produce equal `SourcePath`s and therefore the same graph
//! node and index key.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{CacheError, Result};


/// A normalized absolute path identifying one source file.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourcePath(String);

impl SourcePath {
    /// Normalizes `path` against the current working directory.
    ///
    /// Fails fast with [`CacheError::InvalidPath`] for an empty path and with
    /// [`CacheError::InvalidUtf8Path`] for a path that cannot be stored in the
    /// manifest.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(CacheError::InvalidPath {
                message: "source path must not be empty".to_string(),
            });
        }

        let normalized = normalize_path(path)?;
        let string = normalized
            .to_str()
            .ok_or_else(|| CacheError::InvalidUtf8Path(normalized.clone()))?
            .to_string();

        Ok(Self(string))
    }

    /// The normalized path as a string slice, as stored in the manifest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The normalized path.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl AsRef<Path> for SourcePath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<Path> for SourcePath {
    fn eq(&self, other: &Path) -> bool {
        self.as_path() == other
    }
}

impl PartialEq<PathBuf> for SourcePath {
    fn eq(&self, other: &PathBuf) -> bool {
        self.as_path() == other.as_path()
    }
}

/// Normalize a path to be absolute and clean, without requiring it to exist.
///
/// This function:
/// - Converts relative paths to absolute using the current directory
/// - Removes `.` and `..` components lexically
/// - Does NOT resolve symlinks
/// - Does NOT require the path to exist
pub fn normalize_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();

    let absolute = if path.is_relative() {
        let cwd = std::env::current_dir().map_err(|source| CacheError::IoError {
            path: PathBuf::from("."),
            source,
        })?;
        cwd.join(path)
    } else {
        path.to_path_buf()
    };

    let mut components: Vec<Component<'_>> = Vec::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => continue,
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                // `..` at the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            _ => components.push(component),
        }
    }

    let mut result = PathBuf::new();
    for component in components {
        result.push(component);
    }

    Ok(result)
}
