//! Human-readable run summary.

use crate::analyzer::AnalysisResult;
use colored::Colorize;
use std::io::Write;

/// Prints the run summary: totals, per-symbol parameter records, and any
/// files that failed to parse.
///
/// # Errors
///
/// Returns an error if writing to the writer fails.
pub fn print_summary(writer: &mut impl Write, result: &AnalysisResult) -> std::io::Result<()> {
    writeln!(writer, "{}", "Argument state analysis".bold())?;
    writeln!(
        writer,
        "  {} file(s), {} call site(s), {} distinct value(s)",
        result.files_analyzed,
        result.call_sites,
        result.store.total_values()
    )?;

    for symbol in result.store.symbols() {
        let params = result.store.params(symbol);
        if params.is_empty() {
            writeln!(writer, "\n{}  {}", symbol.cyan().bold(), "(no call sites)".dimmed())?;
            continue;
        }
        writeln!(writer, "\n{}", symbol.cyan().bold())?;
        for (position, record) in params.iter().enumerate() {
            let values = record.values().join(", ");
            let marker = if record.is_unbounded() {
                "unbounded".yellow()
            } else {
                "finite".green()
            };
            writeln!(writer, "  param{}: [{values}] {marker}", position + 1)?;
        }
    }

    if !result.parse_errors.is_empty() {
        writeln!(writer, "\n{}", "Parse errors".red().bold())?;
        for error in &result.parse_errors {
            writeln!(writer, "  {}: {}", error.file.display(), error.error)?;
        }
    }

    Ok(())
}
