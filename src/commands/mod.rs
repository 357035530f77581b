//! Implementation of konpeito-cache subcommands.
//!
//! `mod.rs` is a thin dispatcher; command logic lives in dedicated modules.
//! Every command opens its own [`CacheManager`] from the global options, so
//! a command only ever sees what a previous build persisted.

use crate::cache::CacheManager;
use crate::cli::{Cli, Commands};
use crate::error::Result;
use crate::logging::Logger;

pub(crate) mod check;
pub(crate) mod clean;
pub(crate) mod order;
pub(crate) mod status;

pub use check::check;
pub use clean::clean;
pub use order::order;
pub use status::status;

#[cfg(test)]
mod tests;

/// Execute commands based on the parsed CLI arguments.
pub fn execute(cli: &Cli) -> Result<()> {
    let config = cli.global_opts().cache_config()?;
    let log = Logger::new(config.verbose(), config.quiet());
    let cache = CacheManager::open(config);

    match cli.command() {
        Commands::Status => status(&cache, &log).map(drop),
        Commands::Check { files } => check(&cache, files, &log).map(drop),
        Commands::Order { files } => order(&cache, files, &log).map(drop),
        Commands::Clean => clean(&cache, &log),
    }
}
