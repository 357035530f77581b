//! Order command implementation.

use std::path::PathBuf;

use crate::cache::CacheManager;
use crate::error::Result;
use crate::logging::Logger;
use crate::path::SourcePath;

/// Executes the order command.
///
/// Prints the recompile order to stdout, one file per line.
pub fn order(cache: &CacheManager, files: &[PathBuf], log: &Logger) -> Result<Vec<SourcePath>> {
    if !cache.cache_exists() {
        log.warn("No cache manifest found; only the given files will be listed");
    }

    let order = cache.recompile_order(files)?;

    for file in &order {
        println!("{file}");
    }
    log.verbose(
        1,
        format!(
            "{} file(s) to recompile for {} changed file(s)",
            order.len(),
            files.len()
        ),
    );

    Ok(order)
}
