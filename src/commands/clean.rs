//! Clean command implementation.

use crate::cache::CacheManager;
use crate::error::Result;
use crate::logging::Logger;

/// Executes the clean command (discard the persisted cache).
pub fn clean(cache: &CacheManager, log: &Logger) -> Result<()> {
    let manifest_path = cache.config().manifest_path();
    log.verbose(1, format!("Cleaning cache manifest at {manifest_path:?}"));

    cache.clean()?;

    log.verbose(1, "Cache cleaned successfully");

    Ok(())
}
