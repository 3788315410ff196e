//! Traversal rules shared by the scanner, the checksum walk and the repo guard

use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Component, Path};
use walkdir::{DirEntry, WalkDir};

/// Version-control directory that is never descended into.
pub const VCS_DIR: &str = ".git";

/// Metadata file in the target root that is neither required nor removed.
pub const PROTECTED_FILE: &str = ".gitattributes";

/// Walker used for every traversal: no symlink following, lexical order
/// within each directory so repeated runs visit files identically.
pub fn walker(root: &Path) -> WalkDir {
    WalkDir::new(root).follow_links(false).sort_by_file_name()
}

/// True for the top-level version-control directory of a walk.
pub fn is_vcs_dir(entry: &DirEntry) -> bool {
    entry.depth() == 1 && entry.file_type().is_dir() && entry.file_name() == VCS_DIR
}

/// Path of `path` relative to `root` as raw bytes, `/`-separated on every platform.
///
/// On Unix the name bytes are kept exactly, so non UTF-8 names stay distinct.
pub fn relative_path_bytes(root: &Path, path: &Path) -> Vec<u8> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut out = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            if !out.is_empty() {
                out.push(b'/');
            }
            out.extend_from_slice(&name_bytes(part));
        }
    }
    out
}

/// Lossy, printable form of [`relative_path_bytes`] for log messages.
pub fn relative_path(root: &Path, path: &Path) -> String {
    String::from_utf8_lossy(&relative_path_bytes(root, path)).into_owned()
}

#[cfg(unix)]
fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(name.as_bytes())
}

#[cfg(not(unix))]
fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    match name.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}
