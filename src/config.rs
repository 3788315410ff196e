//! Run configuration
//!
//! A [`Config`] can only be built through [`Config::new`], so every value the
//! pipeline receives already satisfies the path and algorithm invariants.

use crate::algorithm::DigestAlgorithm;
use crate::error::ConfigError;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// How manifest lines mark the path column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// `<hex>  <path>` (space marker)
    Text,
    /// `<hex> *<path>`
    Binary,
}

impl PrintMode {
    /// Resolve the `--text` / `--binary` flags. Neither flag means binary.
    pub fn from_flags(text: bool, binary: bool) -> Result<Self, ConfigError> {
        match (text, binary) {
            (true, true) => Err(ConfigError::ConflictingModes),
            (true, false) => Ok(PrintMode::Text),
            _ => Ok(PrintMode::Binary),
        }
    }

    /// Single character written between the digest separator and the path
    pub fn marker(self) -> char {
        match self {
            PrintMode::Text => ' ',
            PrintMode::Binary => '*',
        }
    }
}

impl fmt::Display for PrintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrintMode::Text => f.write_str("text"),
            PrintMode::Binary => f.write_str("binary"),
        }
    }
}

/// Validated, immutable settings for one checksum run.
#[derive(Debug, Clone)]
pub struct Config {
    mode: PrintMode,
    algorithms: Vec<DigestAlgorithm>,
    source_dir: PathBuf,
    target_dir: PathBuf,
}

impl Config {
    /// Build a configuration, rejecting anything the pipeline cannot run with.
    ///
    /// Algorithms keep their given order. Both paths must be existing
    /// directories, distinct, and neither may contain the other.
    pub fn new(
        mode: PrintMode,
        algorithms: Vec<DigestAlgorithm>,
        source_dir: impl Into<PathBuf>,
        target_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if algorithms.is_empty() {
            return Err(ConfigError::NoAlgorithms);
        }
        let mut seen = HashSet::new();
        for algo in &algorithms {
            if !seen.insert(*algo) {
                return Err(ConfigError::DuplicateAlgorithm(*algo));
            }
        }

        let source_dir = source_dir.into();
        let target_dir = target_dir.into();
        let source_real = check_directory("source", &source_dir)?;
        let target_real = check_directory("target", &target_dir)?;

        if source_real == target_real {
            return Err(ConfigError::SameDirectory { path: source_real });
        }
        if target_real.starts_with(&source_real) {
            return Err(ConfigError::NestedDirectories {
                inner: target_dir,
                outer: source_dir,
            });
        }
        if source_real.starts_with(&target_real) {
            return Err(ConfigError::NestedDirectories {
                inner: source_dir,
                outer: target_dir,
            });
        }

        Ok(Self {
            mode,
            algorithms,
            source_dir,
            target_dir,
        })
    }

    pub fn mode(&self) -> PrintMode {
        self.mode
    }

    pub fn algorithms(&self) -> &[DigestAlgorithm] {
        &self.algorithms
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Manifest filenames this configuration produces, in algorithm order
    pub fn manifest_names(&self) -> Vec<String> {
        self.algorithms.iter().map(|a| a.manifest_name()).collect()
    }
}

/// Check that `path` is a non-empty, existing directory and return its canonical form.
fn check_directory(role: &'static str, path: &Path) -> Result<PathBuf, ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::EmptyPath { role });
    }

    let metadata = std::fs::metadata(path).map_err(|_| ConfigError::PathNotFound {
        role,
        path: path.to_path_buf(),
    })?;
    if !metadata.is_dir() {
        return Err(ConfigError::NotADirectory {
            role,
            path: path.to_path_buf(),
        });
    }

    path.canonicalize().map_err(|_| ConfigError::PathNotFound {
        role,
        path: path.to_path_buf(),
    })
}
