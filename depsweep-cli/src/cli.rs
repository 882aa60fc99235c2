//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// depsweep -- collect a de-duplicated package inventory from a source tree.
///
/// Use `depsweep <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "depsweep", version, about, long_about = None)]
pub struct Cli {
    /// Path to the depsweep.toml configuration file.
    ///
    /// A missing file is not an error; defaults and environment overrides apply.
    #[arg(short, long, global = true, default_value = "depsweep.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Walk a directory and print the consolidated package list.
    Collect(CollectArgs),

    /// List registered collectors and the files they claim.
    Collectors,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- collect ----

/// Walk a directory tree and consolidate every package found.
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Root directory to walk (default: current directory).
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Drop packages whose version could not be determined.
    #[arg(long)]
    pub strict: bool,

    /// Additional ignore glob (repeatable), merged with the configured patterns.
    #[arg(long = "ignore", value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Comma-separated collector names to enable (replaces the configured list).
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub collectors: Vec<String>,

    /// Allow package manager CLIs (e.g. `cargo metadata`) for enrichment.
    #[arg(long)]
    pub external_tools: bool,

    /// Prefix removed from each package's source location (default: the walk root).
    #[arg(long, value_name = "PATH")]
    pub strip_prefix: Option<String>,
}

// ---- config ----

/// Manage depsweep configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, collect).
        #[arg(long)]
        section: Option<String>,
    },
}
