//! Checksum pipeline: guard the target, walk the source once, fan every file
//! out to all manifest writers while the scanner and progress line run alongside.

use crate::broadcast::Broadcast;
use crate::config::Config;
use crate::error::{MultisumError, Result};
use crate::manifest::ManifestWriter;
use crate::progress::{ProgressAggregator, ProgressCounter};
use crate::repo_guard::RepoGuard;
use crate::scanner::DirectoryScanner;
use crate::walk;
use indicatif::ProgressBar;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Phase of a checksum run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    Resetting,
    /// Scanner, progress line and checksum walk running together
    Writing,
    Draining,
    Done,
    Failed,
}

/// What a completed run produced.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Files checksummed (one line in every manifest each)
    pub processed: u64,
    /// Bytes read from the source tree
    pub bytes_hashed: u64,
    /// Entries skipped with a warning
    pub skipped: u64,
    /// Manifest files written, in algorithm order
    pub manifests: Vec<PathBuf>,
    pub duration: Duration,
}

/// Drives one run for one [`Config`].
pub struct ChecksumPipeline {
    config: Config,
    guard: RepoGuard,
    bar: ProgressBar,
    progress_interval: Option<Duration>,
    phase: Phase,
}

impl ChecksumPipeline {
    pub fn new(config: Config) -> Self {
        let guard = RepoGuard::new(config.manifest_names());
        Self {
            config,
            guard,
            bar: ProgressBar::hidden(),
            progress_interval: None,
            phase: Phase::Idle,
        }
    }

    /// Draw the status line on `bar` instead of keeping it hidden.
    pub fn with_progress_bar(mut self, bar: ProgressBar) -> Self {
        self.bar = bar;
        self
    }

    /// Override the status line cadence.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run the whole pipeline. On failure the phase is left at `Failed`.
    pub fn run(&mut self) -> Result<RunSummary> {
        let result = self.execute();
        self.phase = if result.is_ok() { Phase::Done } else { Phase::Failed };
        result
    }

    fn execute(&mut self) -> Result<RunSummary> {
        let started = Instant::now();
        let target = self.config.target_dir().to_path_buf();
        let source = self.config.source_dir().to_path_buf();

        self.phase = Phase::Validating;
        info!("validating {}", target.display());
        self.guard.validate(&target)?;

        self.phase = Phase::Resetting;
        info!("resetting {}", target.display());
        self.guard.reset(&target)?;

        self.phase = Phase::Writing;
        let mut scanner = DirectoryScanner::new();
        scanner.start(&source);

        let processed = Arc::new(ProgressCounter::new());
        let mut aggregator =
            ProgressAggregator::new(Arc::clone(&processed), scanner.state(), self.bar.clone());
        if let Some(interval) = self.progress_interval {
            aggregator = aggregator.with_interval(interval);
        }
        aggregator.start();

        let mut writers: Vec<ManifestWriter> = self
            .config
            .algorithms()
            .iter()
            .map(|algo| ManifestWriter::new(&target, *algo, self.config.mode()))
            .collect();

        let mut summary = RunSummary {
            manifests: writers.iter().map(|w| w.path().to_path_buf()).collect(),
            ..RunSummary::default()
        };

        let walked = match open_all(&mut writers) {
            Ok(()) => checksum_tree(&source, &mut writers, &processed, &mut summary),
            Err(e) => Err(e),
        };

        self.phase = Phase::Draining;
        let closed = close_all(&mut writers);

        scanner.stop();
        aggregator.stop();
        aggregator.print_final();

        walked?;
        closed?;

        summary.processed = processed.get();
        summary.duration = started.elapsed();
        info!(
            "wrote {} manifests for {} files",
            summary.manifests.len(),
            summary.processed
        );
        Ok(summary)
    }
}

/// Open every writer, stopping at the first failure.
fn open_all(writers: &mut [ManifestWriter]) -> Result<()> {
    for writer in writers.iter_mut() {
        writer.open()?;
        debug!("opened {} manifest {}", writer.algorithm(), writer.path().display());
    }
    Ok(())
}

/// Close every writer, returning the first error after trying them all.
fn close_all(writers: &mut [ManifestWriter]) -> Result<()> {
    let mut first_error = None;
    for writer in writers.iter_mut() {
        if let Err(e) = writer.close() {
            warn!("{}", e);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Walk `source` once and append one line per regular file to every writer.
fn checksum_tree(
    source: &Path,
    writers: &mut [ManifestWriter],
    processed: &ProgressCounter,
    summary: &mut RunSummary,
) -> Result<()> {
    let mut it = walk::walker(source).min_depth(1).into_iter();

    while let Some(entry) = it.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("{}", e);
                summary.skipped += 1;
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            if walk::is_vcs_dir(&entry) {
                warn!("ignoring git repository {}", entry.path().display());
                summary.skipped += 1;
                it.skip_current_dir();
            }
            continue;
        }

        if !file_type.is_file() {
            warn!("skipping non regular file {}", walk::relative_path(source, entry.path()));
            summary.skipped += 1;
            continue;
        }

        summary.bytes_hashed += checksum_file(entry.path(), writers)?;

        let relative = walk::relative_path_bytes(source, entry.path());
        for writer in writers.iter_mut() {
            writer.write_checksum(&relative)?;
        }

        processed.increment();
    }

    Ok(())
}

/// Stream one file through every writer's accumulator in a single read.
fn checksum_file(path: &Path, writers: &mut [ManifestWriter]) -> Result<u64> {
    let mut file = File::open(path).map_err(|e| MultisumError::io("open", path, e))?;
    let mut broadcast = Broadcast::new(writers);
    io::copy(&mut file, &mut broadcast).map_err(|e| MultisumError::io("read", path, e))
}
