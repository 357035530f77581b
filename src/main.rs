//! # konpeito-cache CLI
//!
//! Maintenance tool for the Konpeito incremental compilation cache.
//!
//! ## Commands
//!
//! - **status**: Summarizes the persisted cache
//! - **check**: Lists source files whose cached syntax tree is no longer valid
//! - **order**: Prints the recompile order for a set of changed files
//! - **clean**: Discards the persisted cache
//!
//! ## Quick Start
//!
//! ```bash
//! # Which of these files must be reparsed?
//! konpeito-cache check src/*.rb
//!
//! # util.rb changed: what must be recompiled, and in which order?
//! konpeito-cache order src/util.rb
//! ```
//!
//! ## Environment Variables
//!
//! - `KONPEITO_CACHE_DIR`: Override the cache directory (default:
//!   ./.konpeito_cache)
//! - `KONPEITO_TOOLCHAIN_VERSION`: Toolchain version the manifest must match
//! - `KONPEITO_CACHE_VERBOSE`: Enable verbose output
//! - `KONPEITO_CACHE_QUIET`: Silence all output except errors

use std::io::IsTerminal;

use konpeito_cache::cli::Cli;

fn main() -> miette::Result<()> {
    miette::set_panic_hook();

    // Plain reports when stderr is not a terminal (CI, logs)
    if std::io::stderr().is_terminal() {
        miette::set_hook(Box::new(|_| {
            Box::new(
                miette::GraphicalReportHandler::new()
                    .with_theme(miette::GraphicalTheme::unicode_nocolor())
                    .with_context_lines(3),
            )
        }))?;
    } else {
        miette::set_hook(Box::new(|_| {
            Box::new(
                miette::GraphicalReportHandler::new()
                    .with_theme(miette::GraphicalTheme::none())
                    .with_context_lines(0),
            )
        }))?;
    }

    let cli = Cli::parse_args();

    konpeito_cache::commands::execute(&cli).map_err(Into::into)
}
