//! Run configuration: `argstates.toml` discovery and the symbols list.

use crate::constants::CONFIG_FILENAME;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration file model.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Config {
    /// The `[argstates]` table.
    #[serde(default)]
    pub argstates: ArgStatesConfig,
}

/// Settings under `[argstates]`. Command-line flags override these.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ArgStatesConfig {
    /// Target function symbols.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// File with one target symbol per line.
    #[serde(default)]
    pub symbols_file: Option<PathBuf>,
    /// Folder names excluded from the walk.
    #[serde(default)]
    pub exclude_folders: Vec<String>,
    /// Path for the JSON report.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl Config {
    /// Loads configuration by walking up from `path` until an
    /// `argstates.toml` is found; falls back to defaults.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let mut current = path.to_path_buf();
        if current.is_file() {
            current.pop();
        }

        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                if let Ok(content) = fs::read_to_string(&candidate) {
                    if let Ok(config) = toml::from_str::<Config>(&content) {
                        return config;
                    }
                }
            }
            if !current.pop() {
                return Config::default();
            }
        }
    }
}

/// Reads a symbols file: one symbol per line, blank lines ignored.
pub fn read_symbols_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading symbols file {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn load_walks_up_to_find_config() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        let mut file = fs::File::create(dir.path().join(CONFIG_FILENAME)).unwrap();
        writeln!(
            file,
            "[argstates]\nsymbols = [\"parse_header\"]\nexclude_folders = [\"vendor\"]"
        )
        .unwrap();

        let config = Config::load(&nested);
        assert_eq!(config.argstates.symbols, ["parse_header"]);
        assert_eq!(config.argstates.exclude_folders, ["vendor"]);
    }

    #[test]
    fn symbols_file_skips_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("names.txt");
        fs::write(&path, "alpha\n\n  beta  \n").unwrap();
        assert_eq!(read_symbols_file(&path).unwrap(), ["alpha", "beta"]);
    }

    #[test]
    fn missing_symbols_file_is_an_error() {
        assert!(read_symbols_file(Path::new("/nonexistent/names.txt")).is_err());
    }
}
