//! Command line interface configuration using `clap`.

use clap::Parser;
use std::path::PathBuf;

/// Enumerate the concrete value states of arguments at every call site of
/// the given target functions.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Paths to analyze (files or directories).
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Target function symbol (repeatable).
    #[arg(short, long = "symbol")]
    pub symbols: Vec<String>,

    /// File with one target symbol per line.
    #[arg(long)]
    pub symbols_file: Option<PathBuf>,

    /// Path for the JSON report.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the JSON report to stdout.
    #[arg(long)]
    pub json: bool,

    /// Suppress the human-readable summary.
    #[arg(short, long)]
    pub quiet: bool,

    /// Folders to exclude from analysis.
    #[arg(long, alias = "exclude-folder")]
    pub exclude_folders: Vec<String>,

    /// Include test files in analysis.
    #[arg(long)]
    pub include_tests: bool,
}
