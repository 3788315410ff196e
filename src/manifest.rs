//! One checksum manifest (`<ALGO>SUMS`) and its digest accumulator

use crate::algorithm::DigestAlgorithm;
use crate::config::PrintMode;
use crate::error::{MultisumError, Result};
use digest::DynDigest;
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends `<hex> <marker><path>` lines for one algorithm.
///
/// Bytes written through [`Write`] feed the accumulator; nothing reaches the
/// manifest file until [`ManifestWriter::write_checksum`] is called.
pub struct ManifestWriter {
    algorithm: DigestAlgorithm,
    marker: u8,
    path: PathBuf,
    hasher: Box<dyn DynDigest + Send>,
    out: Option<BufWriter<File>>,
}

impl ManifestWriter {
    pub fn new(target_dir: &Path, algorithm: DigestAlgorithm, mode: PrintMode) -> Self {
        Self {
            algorithm,
            marker: mode.marker() as u8,
            path: target_dir.join(algorithm.manifest_name()),
            hasher: algorithm.new_hasher(),
            out: None,
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Manifest file this writer produces
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create (or truncate) the manifest file.
    pub fn open(&mut self) -> Result<()> {
        let file = File::create(&self.path).map_err(|e| MultisumError::io("create", &self.path, e))?;
        self.out = Some(BufWriter::new(file));
        Ok(())
    }

    /// Append a line for the digest accumulated so far, then reset the accumulator.
    ///
    /// `relative_path` is written byte for byte. A path holding `\\` or a
    /// newline is escaped and the line gets a leading `\\`, as `md5sum` does,
    /// so every file stays on exactly one line.
    /// The accumulator is reset even when the write fails.
    pub fn write_checksum(&mut self, relative_path: &[u8]) -> Result<()> {
        let digest = hex::encode(self.hasher.finalize_reset());

        let out = self.out.as_mut().ok_or_else(|| {
            MultisumError::io("write", &self.path, io::Error::other("manifest is not open"))
        })?;

        let (escaped, path) = escape_path(relative_path);
        let mut line = Vec::with_capacity(digest.len() + path.len() + 4);
        if escaped {
            line.push(b'\\');
        }
        line.extend_from_slice(digest.as_bytes());
        line.push(b' ');
        line.push(self.marker);
        line.extend_from_slice(&path);
        line.push(b'\n');

        out.write_all(&line)
            .map_err(|e| MultisumError::io("write", &self.path, e))
    }

    /// Flush buffered lines and close the file. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut out) = self.out.take() {
            out.flush().map_err(|e| MultisumError::io("flush", &self.path, e))?;
        }
        Ok(())
    }
}

/// Escape `\\` and newline in a manifest path. Returns whether anything changed.
fn escape_path(path: &[u8]) -> (bool, Cow<'_, [u8]>) {
    if !path.iter().any(|b| *b == b'\\' || *b == b'\n') {
        return (false, Cow::Borrowed(path));
    }

    let mut out = Vec::with_capacity(path.len() + 8);
    for &b in path {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(b),
        }
    }
    (true, Cow::Owned(out))
}

impl Write for ManifestWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.hasher.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
