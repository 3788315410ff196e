//! Error types for checksum manifest generation.
//!
//! Fatal conditions surface as [`MultisumError`]. Skipped walk entries are
//! never errors; they are logged and counted in the run summary instead.

use crate::algorithm::DigestAlgorithm;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can abort a checksum run.
#[derive(Debug, Error)]
pub enum MultisumError {
    #[error("unexpected file {} found in target directory", path.display())]
    ForeignFile { path: PathBuf },

    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MultisumError {
    pub(crate) fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn walk(path: &Path, source: walkdir::Error) -> Self {
        let path = source.path().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf());
        Self::Io {
            action: "walk",
            path,
            source: source.into(),
        }
    }
}

/// Invalid or contradictory configuration, detected before any I/O.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one digest algorithm is required")]
    NoAlgorithms,

    #[error("digest algorithm {0} requested more than once")]
    DuplicateAlgorithm(DigestAlgorithm),

    #[error("unknown digest algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("--text and --binary are mutually exclusive")]
    ConflictingModes,

    #[error("{role}: empty path")]
    EmptyPath { role: &'static str },

    #[error("{role}: {} does not exist or is not accessible", path.display())]
    PathNotFound { role: &'static str, path: PathBuf },

    #[error("{role}: {} is not a directory", path.display())]
    NotADirectory { role: &'static str, path: PathBuf },

    #[error("source and target are the same directory: {}", path.display())]
    SameDirectory { path: PathBuf },

    #[error("{} is nested inside {}", inner.display(), outer.display())]
    NestedDirectories { inner: PathBuf, outer: PathBuf },
}

pub type Result<T> = std::result::Result<T, MultisumError>;
