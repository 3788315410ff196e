//! Guard for the managed output directory
//!
//! The target directory only ever holds generated manifests, a `.git`
//! directory and a root-level `.gitattributes`. [`RepoGuard::validate`]
//! refuses to touch anything else; [`RepoGuard::reset`] clears the rest.

use crate::error::{MultisumError, Result};
use crate::walk::{self, PROTECTED_FILE, VCS_DIR};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// What the target directory may contain and what survives a reset.
#[derive(Debug, Clone)]
pub struct RepoGuard {
    allowed: HashSet<String>,
}

/// Outcome of the exclusion rules for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryRule {
    /// `.git` at the root: never inspected, never removed
    SkipTree,
    /// `.gitattributes` at the root: never removed
    Keep,
    /// Anything else at the root is removed by a reset
    Remove,
}

/// Single place deciding how a root-level entry is treated.
fn rule_for(name: &str, is_dir: bool) -> EntryRule {
    if is_dir && name == VCS_DIR {
        EntryRule::SkipTree
    } else if !is_dir && name == PROTECTED_FILE {
        EntryRule::Keep
    } else {
        EntryRule::Remove
    }
}

impl RepoGuard {
    /// Guard accepting exactly the given manifest filenames.
    pub fn new<I, S>(manifest_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: manifest_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Dry run: fail with `ForeignFile` on the first file that is neither a
    /// recognized manifest nor the protected file. Mutates nothing.
    pub fn validate(&self, target: &Path) -> Result<()> {
        let mut it = walk::walker(target).min_depth(1).into_iter();

        while let Some(entry) = it.next() {
            let entry = entry.map_err(|e| MultisumError::walk(target, e))?;
            let name = entry.file_name().to_string_lossy();
            let is_dir = entry.file_type().is_dir();

            if entry.depth() == 1 {
                match rule_for(&name, is_dir) {
                    EntryRule::SkipTree => {
                        it.skip_current_dir();
                        continue;
                    }
                    EntryRule::Keep => continue,
                    EntryRule::Remove => {}
                }
            }

            if is_dir {
                continue;
            }

            if !self.allowed.contains(&*name) {
                return Err(MultisumError::ForeignFile {
                    path: entry.path().to_path_buf(),
                });
            }
        }

        Ok(())
    }

    /// Delete everything below `target` except `.git` and `.gitattributes`.
    ///
    /// Directories are removed recursively in one step.
    pub fn reset(&self, target: &Path) -> Result<()> {
        let entries = fs::read_dir(target).map_err(|e| MultisumError::io("read", target, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| MultisumError::io("read", target, e))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| MultisumError::io("stat", &path, e))?;
            let is_dir = file_type.is_dir();

            match rule_for(&entry.file_name().to_string_lossy(), is_dir) {
                EntryRule::SkipTree | EntryRule::Keep => continue,
                EntryRule::Remove => {}
            }

            debug!("reset: removing {}", path.display());
            if is_dir {
                fs::remove_dir_all(&path).map_err(|e| MultisumError::io("remove", &path, e))?;
            } else {
                fs::remove_file(&path).map_err(|e| MultisumError::io("remove", &path, e))?;
            }
        }

        Ok(())
    }
}
