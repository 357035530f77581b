//! Check command implementation.

use std::path::PathBuf;

use crate::cache::{CacheManager, ChangeSet};
use crate::error::Result;
use crate::logging::Logger;
use crate::path::SourcePath;

/// Executes the check command.
///
/// Prints every file that needs recompiling to stdout, one per line, and a
/// per-bucket summary to stderr.
pub fn check(cache: &CacheManager, files: &[PathBuf], log: &Logger) -> Result<ChangeSet> {
    log.verbose(1, format!("Checking {} file(s) against the cache", files.len()));

    let changes = cache.detect_changes(files)?;

    for file in changes.dirty_files() {
        println!("{file}");
    }

    log.info("Change summary:");
    log.info(format!("  Unchanged: {}", changes.unchanged_files.len()));
    log.info(format!("  Modified: {}", changes.modified_files.len()));
    log.info(format!("  New: {}", changes.new_files.len()));
    log.info(format!("  Missing: {}", changes.missing_files.len()));

    report(log, 2, "unchanged", &changes.unchanged_files);
    report(log, 1, "missing", &changes.missing_files);

    Ok(changes)
}

fn report(log: &Logger, level: u8, label: &str, files: &[SourcePath]) {
    for file in files {
        log.verbose(level, format!("  {label}: {file}"));
    }
}
