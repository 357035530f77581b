//! Status command implementation.

use crate::cache::{CacheManager, CacheStats};
use crate::error::Result;
use crate::logging::Logger;

/// Executes the status command (summarize the persisted cache).
pub fn status(cache: &CacheManager, log: &Logger) -> Result<CacheStats> {
    let stats = cache.stats();
    let config = cache.config();

    log.verbose(1, format!("Cache directory: {}", config.cache_dir().display()));
    log.verbose(1, format!("Toolchain version: {}", config.toolchain_version()));

    match stats.manifest_bytes {
        Some(bytes) => log.info(format!(
            "Cache is warm ({} manifest at {})",
            format_size(bytes),
            config.manifest_path().display()
        )),
        None => log.info("Cache is cold (no manifest saved yet)"),
    }
    log.info(format!("  Cached files: {}", stats.cached_files));
    log.info(format!("  Stored artifacts: {}", stats.artifacts));
    log.info(format!(
        "  Dependency edges: {} across {} file(s)",
        stats.dependency_edges, stats.graph_files
    ));

    Ok(stats)
}

/// Format size in human-readable format
pub(crate) fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;

    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
