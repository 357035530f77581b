//! Command-line interface definitions for konpeito-cache.
//!
//! This module defines the CLI structure using clap, including all subcommands
//! and their arguments. The main entry point is the [`Cli`] struct.
//!
//! # Example
//!
//! ```no_run
//! use konpeito_cache::cli::{Cli, Commands};
//!
//! // Parse command-line arguments
//! let cli = Cli::parse_args();
//!
//! // Access the parsed command
//! match cli.command() {
//!     Commands::Order { files } => println!("Ordering {} seed(s)", files.len()),
//!     _ => {}
//! }
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::cache::{CacheConfig, DEFAULT_CACHE_DIR};
use crate::error::{CacheError, Result};


/// Main command-line interface for konpeito-cache.
///
/// Holds the global options that locate and configure the cache, and the
/// subcommand to run against it.
#[derive(Parser)]
#[command(
    name = "konpeito-cache",
    bin_name = "konpeito-cache",
    author,
    version,
    about = "Inspect and maintain the Konpeito incremental compilation cache",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    global_opts: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

/// Global options that apply to all konpeito-cache commands.
#[derive(Parser)]
pub struct GlobalOpts {
    /// Path to the cache directory (defaults to ./.konpeito_cache)
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_CACHE_DIR,
        env = "KONPEITO_CACHE_DIR"
    )]
    cache_dir: PathBuf,

    /// Toolchain version the manifest must have been written by (defaults to
    /// this tool's version)
    #[arg(long, global = true, env = "KONPEITO_TOOLCHAIN_VERSION")]
    toolchain_version: Option<String>,

    /// Enable verbose output (use multiple times for more verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count, env = "KONPEITO_CACHE_VERBOSE")]
    verbose: u8,

    /// Silence all output except for errors
    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        env = "KONPEITO_CACHE_QUIET"
    )]
    quiet: bool,
}

impl GlobalOpts {
    /// Get the cache directory as given
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the toolchain version override
    pub fn toolchain_version(&self) -> Option<&str> {
        self.toolchain_version.as_deref()
    }

    /// Get the verbose level
    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// Build the cache configuration these options describe.
    pub fn cache_config(&self) -> Result<CacheConfig> {
        let builder = CacheConfig::builder()
            .cache_dir(&self.cache_dir)
            .verbose(self.verbose)
            .quiet(self.quiet);

        match &self.toolchain_version {
            Some(version) => builder.toolchain_version(version).build(),
            None => builder.build(),
        }
    }
}

impl Cli {
    /// Get the global options
    pub fn global_opts(&self) -> &GlobalOpts {
        &self.global_opts
    }

    /// Get the command
    pub fn command(&self) -> &Commands {
        &self.command
    }

    /// Create a builder for programmatic construction
    pub fn builder() -> CliBuilder {
        CliBuilder::default()
    }

    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Builder for [`Cli`]
#[derive(Debug, Default)]
pub struct CliBuilder {
    cache_dir: Option<PathBuf>,
    toolchain_version: Option<String>,
    verbose: u8,
    quiet: bool,
    command: Option<Commands>,
}

impl CliBuilder {
    /// Set the cache directory
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set the toolchain version
    pub fn toolchain_version(mut self, version: impl Into<String>) -> Self {
        self.toolchain_version = Some(version.into());
        self
    }

    /// Set the verbose level
    pub fn verbose(mut self, level: u8) -> Self {
        self.verbose = level;
        self
    }

    /// Enable quiet mode
    pub fn quiet(mut self, enabled: bool) -> Self {
        self.quiet = enabled;
        self
    }

    /// Set the command
    pub fn command(mut self, command: Commands) -> Self {
        self.command = Some(command);
        self
    }

    /// Build the Cli instance
    pub fn build(self) -> Result<Cli> {
        let command = self
            .command
            .ok_or_else(|| CacheError::ConfigError("Command is required".to_string()))?;

        Ok(Cli {
            global_opts: GlobalOpts {
                cache_dir: self
                    .cache_dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
                toolchain_version: self.toolchain_version,
                verbose: self.verbose,
                quiet: self.quiet,
            },
            command,
        })
    }
}

/// Available konpeito-cache subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show what the persisted cache holds
    ///
    /// Reports whether a manifest exists, how many files and artifacts it
    /// stores, how many dependency edges it records, and its size on disk.
    Status,

    /// Check source files against the persisted cache
    ///
    /// Hashes every given file and classifies it:
    /// - Unchanged: the stored syntax tree is still valid
    /// - Modified: a syntax tree is stored, but for different content
    /// - New: nothing is stored for the file
    /// - Missing: the file could not be read
    Check {
        /// Source files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the recompile order for changed files
    ///
    /// Lists the given files and everything that transitively depends on
    /// them, each dependency before its dependents, using the dependency
    /// graph recorded in the manifest.
    Order {
        /// Changed source files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Discard the persisted cache
    ///
    /// Removes the manifest and any leftovers from interrupted saves, forcing
    /// a full recompilation on the next build.
    Clean,
}
