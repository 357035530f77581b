use crate::path::SourcePath;

/// Result of comparing current file contents against the stored ASTs.
///
/// Every file lands in exactly one bucket. Each bucket is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Files with no stored AST.
    pub new_files: Vec<SourcePath>,

    /// Files whose stored AST was computed from different content.
    pub modified_files: Vec<SourcePath>,

    /// Files whose stored AST is still valid.
    pub unchanged_files: Vec<SourcePath>,

    /// Files that could not be read.
    pub missing_files: Vec<SourcePath>,
}

impl ChangeSet {
    /// Returns `true` if nothing needs recompiling and nothing went missing.
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty() && self.modified_files.is_empty() && self.missing_files.is_empty()
    }

    /// Number of files that need recompiling (new + modified).
    pub fn dirty_count(&self) -> usize {
        self.new_files.len() + self.modified_files.len()
    }

    /// Files that need recompiling, new ones first.
    pub fn dirty_files(&self) -> impl Iterator<Item = &SourcePath> {
        self.new_files.iter().chain(&self.modified_files)
    }

    pub(crate) fn sort(&mut self) {
        self.new_files.sort();
        self.modified_files.sort();
        self.unchanged_files.sort();
        self.missing_files.sort();
    }
}
