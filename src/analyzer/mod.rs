//! Analysis driver: file discovery, per-file passes, and aggregation.
//!
//! Each file is an independent unit of work with no shared mutable state,
//! so files are processed in parallel with `rayon`; the per-file outcomes
//! are folded into the one [`ArgStateStore`] by a single writer, keeping
//! the merge discipline trivial. The walked file list is sorted so repeated
//! runs over unchanged input produce identical reports.

mod single_file;

use crate::store::{ArgStateStore, ValueState};
use anyhow::{ensure, Context, Result};
use ignore::WalkBuilder;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

/// A file that could not be read or parsed. Recorded, never fatal.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// The file that failed.
    pub file: PathBuf,
    /// Human-readable failure description.
    pub error: String,
}

/// Aggregated outcome of one run.
#[derive(Debug)]
pub struct AnalysisResult {
    /// The accumulated argument state records.
    pub store: ArgStateStore,
    /// Number of files analyzed (including failed ones).
    pub files_analyzed: usize,
    /// Total call sites of target symbols found.
    pub call_sites: usize,
    /// Files that failed to read or parse.
    pub parse_errors: Vec<ParseError>,
}

/// Outcome of analyzing one file, folded into the store by the driver.
#[derive(Debug, Default)]
pub(crate) struct FileOutcome {
    /// (symbol, position, state) triples in call order.
    pub(crate) merges: Vec<(String, usize, ValueState)>,
    pub(crate) call_sites: usize,
    pub(crate) parse_error: Option<ParseError>,
}

/// Analyzer configuration and entry points.
pub struct ArgStates {
    /// Target symbols in report order.
    pub symbols: Vec<String>,
    /// Folder names excluded from the walk.
    pub exclude_folders: Vec<String>,
    /// Whether test files are analyzed.
    pub include_tests: bool,
    targets: FxHashSet<String>,
}

impl ArgStates {
    /// Creates an analyzer for the given target symbols.
    #[must_use]
    pub fn new(symbols: Vec<String>) -> Self {
        let targets = symbols.iter().cloned().collect();
        Self {
            symbols,
            exclude_folders: Vec::new(),
            include_tests: false,
            targets,
        }
    }

    /// Builder-style method to set excluded folder names.
    #[must_use]
    pub fn with_excludes(mut self, folders: Vec<String>) -> Self {
        self.exclude_folders = folders;
        self
    }

    /// Builder-style method to include test files.
    #[must_use]
    pub fn with_tests(mut self, include: bool) -> Self {
        self.include_tests = include;
        self
    }

    /// Analyzes every Python file under `root`.
    pub fn analyze(&self, root: &Path) -> Result<AnalysisResult> {
        self.analyze_paths(std::slice::from_ref(&root.to_path_buf()))
    }

    /// Analyzes every Python file under each of `paths`.
    pub fn analyze_paths(&self, paths: &[PathBuf]) -> Result<AnalysisResult> {
        ensure!(
            !self.symbols.is_empty(),
            "no target symbols configured; nothing to analyze"
        );

        let mut files = Vec::new();
        for path in paths {
            self.collect_python_files(path, &mut files)?;
        }
        files.sort();
        files.dedup();

        let outcomes: Vec<FileOutcome> = files
            .par_iter()
            .map(|file| self.process_file(file))
            .collect();

        Ok(self.aggregate(outcomes, files.len()))
    }

    /// Analyzes a single string of code (mostly for testing).
    pub fn analyze_code(&self, code: &str, file_path: &Path) -> Result<AnalysisResult> {
        ensure!(
            !self.symbols.is_empty(),
            "no target symbols configured; nothing to analyze"
        );
        let outcome = single_file::analyze_source(code, file_path, &self.targets);
        Ok(self.aggregate(vec![outcome], 1))
    }

    /// Folds per-file outcomes into the store. Single writer: per-file
    /// analyses are pure, so merge order alone decides report order, and
    /// outcomes arrive in sorted file order.
    fn aggregate(&self, outcomes: Vec<FileOutcome>, files_analyzed: usize) -> AnalysisResult {
        let mut store = ArgStateStore::new(&self.symbols);
        let mut call_sites = 0;
        let mut parse_errors = Vec::new();

        for outcome in outcomes {
            call_sites += outcome.call_sites;
            if let Some(error) = outcome.parse_error {
                parse_errors.push(error);
            }
            for (symbol, position, state) in &outcome.merges {
                store.merge(symbol, *position, state);
            }
        }

        AnalysisResult {
            store,
            files_analyzed,
            call_sites,
            parse_errors,
        }
    }

    fn process_file(&self, file: &Path) -> FileOutcome {
        match std::fs::read_to_string(file) {
            Ok(source) => single_file::analyze_source(&source, file, &self.targets),
            Err(e) => FileOutcome {
                parse_error: Some(ParseError {
                    file: file.to_path_buf(),
                    error: format!("Failed to read file: {e}"),
                }),
                ..FileOutcome::default()
            },
        }
    }

    fn collect_python_files(&self, root: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        if root.is_file() {
            files.push(root.to_path_buf());
            return Ok(());
        }
        for entry in WalkBuilder::new(root).build() {
            let entry = entry.with_context(|| format!("walking {}", root.display()))?;
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if !path.extension().is_some_and(|ext| ext == "py") {
                continue;
            }
            if self.is_excluded(path) {
                continue;
            }
            if !self.include_tests && is_test_path(path) {
                continue;
            }
            files.push(path.to_path_buf());
        }
        Ok(())
    }

    fn is_excluded(&self, path: &Path) -> bool {
        path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| self.exclude_folders.iter().any(|f| f.as_str() == name))
        })
    }
}

/// Heuristic test-file detection: `test_*.py`, `*_test.py`, or any `tests`
/// directory component.
fn is_test_path(path: &Path) -> bool {
    let in_tests_dir = path
        .components()
        .any(|c| matches!(c.as_os_str().to_str(), Some("tests" | "test")));
    let test_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.starts_with("test_") || name.ends_with("_test.py"));
    in_tests_dir || test_file
}
