//! Binary entry point for the `argstates` analysis tool.

use anyhow::{ensure, Context, Result};
use argstates::analyzer::ArgStates;
use argstates::cli::Cli;
use argstates::config::{read_symbols_file, Config};
use argstates::constants::DEFAULT_REPORT_FILENAME;
use argstates::output::print_summary;
use clap::Parser;
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;

fn main() -> Result<()> {
    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    let root = cli.paths.first().cloned().unwrap_or_else(|| PathBuf::from("."));
    let config = Config::load(&root).argstates;

    // CLI flags override file config; the symbols file supplements both.
    let mut symbols = if cli.symbols.is_empty() {
        config.symbols
    } else {
        cli.symbols
    };
    if let Some(path) = cli.symbols_file.or(config.symbols_file) {
        symbols.extend(read_symbols_file(&path)?);
    }
    let mut seen = std::collections::HashSet::new();
    symbols.retain(|s| seen.insert(s.clone()));
    ensure!(
        !symbols.is_empty(),
        "no target symbols: pass --symbol/--symbols-file or configure argstates.toml"
    );

    let exclude_folders = if cli.exclude_folders.is_empty() {
        config.exclude_folders
    } else {
        cli.exclude_folders
    };

    let analyzer = ArgStates::new(symbols)
        .with_excludes(exclude_folders)
        .with_tests(cli.include_tests);
    let result = analyzer.analyze_paths(&cli.paths)?;

    let mut stdout = std::io::stdout().lock();
    if cli.json {
        serde_json::to_writer_pretty(&mut stdout, &result.store)
            .context("serializing report to stdout")?;
        writeln!(stdout)?;
    } else if !cli.quiet {
        print_summary(&mut stdout, &result)?;
    }

    let output = cli
        .output
        .or(config.output)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_FILENAME));
    let report = serde_json::to_string_pretty(&result.store).context("serializing report")?;
    std::fs::write(&output, report)
        .with_context(|| format!("writing report to {}", output.display()))?;

    if !cli.quiet && !cli.json {
        writeln!(stdout, "\nReport written to {}", output.display().to_string().green())?;
    }

    Ok(())
}
