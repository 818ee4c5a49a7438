//! CLI argument definitions for the scene archive loader.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};

#[derive(Parser)]
#[command(
    name = "scar",
    version,
    about = "Scene Archive Studio - load and inspect scene archives",
    long_about = "Load scene archives into an in-memory document and reconcile the\n\
                  window layout with a running session.\n\n\
                  Supports plain, gzip- and zstd-compressed archives in the legacy\n\
                  and modern header layouts."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load an archive end-to-end and print the resulting session state.
    Load(LoadArgs),

    /// Decode and print only the archive's format header.
    Info(InfoArgs),
}

#[derive(Parser)]
pub struct LoadArgs {
    /// Path to the scene archive.
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Keep the running interface layout instead of adopting the archive's.
    #[arg(long = "keep-ui")]
    pub keep_ui: bool,

    /// Ignore user preferences embedded in the archive.
    #[arg(long = "skip-prefs")]
    pub skip_prefs: bool,

    /// Read preferences only; leave document data untouched.
    #[arg(long = "prefs-only")]
    pub prefs_only: bool,

    /// Print the report list as JSON instead of plain text.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct InfoArgs {
    /// Path to the scene archive.
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
