//! Background counting of regular files
//!
//! The scanner runs on its own thread alongside the checksum walk so the
//! progress line can show a total once it is known. Consumers only ever read
//! its state through [`TotalCount`].

use crate::walk;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use tracing::{debug, warn};

/// Read-only view of a file count that may still be in progress.
pub trait TotalCount: Send + Sync {
    /// True while the counting pass has been started and has not finished.
    fn is_scanning(&self) -> bool;

    /// Final count, `None` until the pass completed.
    fn total(&self) -> Option<u64>;
}

/// State shared between the scanner thread and its readers.
#[derive(Debug, Default)]
pub struct ScanState {
    running: AtomicBool,
    total: OnceLock<u64>,
}

impl TotalCount for ScanState {
    fn is_scanning(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn total(&self) -> Option<u64> {
        self.total.get().copied()
    }
}

/// Counts regular files under a root on a background thread.
#[derive(Debug, Default)]
pub struct DirectoryScanner {
    state: Arc<ScanState>,
    cancel: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl DirectoryScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle for readers such as the progress aggregator.
    pub fn state(&self) -> Arc<ScanState> {
        Arc::clone(&self.state)
    }

    /// Launch the counting pass and return immediately.
    ///
    /// A scanner counts once; calling `start` again is a no-op.
    pub fn start(&mut self, root: &Path) {
        let cancel = Arc::clone(&self.cancel);
        self.start_with(root, move || cancel.load(Ordering::Acquire));
    }

    /// Spawn the counting thread, polling `should_stop` before every entry.
    fn start_with<F>(&mut self, root: &Path, should_stop: F)
    where
        F: Fn() -> bool + Send + 'static,
    {
        if self.handle.is_some() {
            return;
        }

        self.state.running.store(true, Ordering::Release);

        let root = root.to_path_buf();
        let state = Arc::clone(&self.state);

        self.handle = Some(thread::spawn(move || {
            if let Some(count) = count_files(&root, should_stop) {
                let _ = state.total.set(count);
                debug!("scan of {} finished: {} files", root.display(), count);
            } else {
                debug!("scan of {} cancelled", root.display());
            }
            state.running.store(false, Ordering::Release);
        }));
    }

    /// Request cancellation. Does not wait for the thread to unwind.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.state.is_scanning()
    }

    /// Final count, `None` while running or if the scan was cancelled.
    pub fn count(&self) -> Option<u64> {
        self.state.total()
    }
}

impl TotalCount for DirectoryScanner {
    fn is_scanning(&self) -> bool {
        self.state.is_scanning()
    }

    fn total(&self) -> Option<u64> {
        self.state.total()
    }
}

/// Count regular files below `root`, skipping the VCS directory.
///
/// Returns `None` when `should_stop` fires before the walk completed.
fn count_files(root: &Path, should_stop: impl Fn() -> bool) -> Option<u64> {
    let mut count = 0u64;
    let mut it = walk::walker(root).into_iter();

    while let Some(entry) = it.next() {
        if should_stop() {
            return None;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // walkdir already leaves out the unreadable subtree
                warn!("scan: {}", e);
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            if walk::is_vcs_dir(&entry) {
                debug!("scan: ignoring git repository {}", entry.path().display());
                it.skip_current_dir();
            }
            continue;
        }

        if !file_type.is_file() {
            debug!("scan: skipping non regular file {}", entry.path().display());
            continue;
        }

        count += 1;
    }

    Some(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::AtomicU64;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn wait_until_done(scanner: &DirectoryScanner) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while scanner.is_running() {
            assert!(Instant::now() < deadline, "scanner did not finish");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_not_running_before_start() {
        let scanner = DirectoryScanner::new();
        assert!(!scanner.is_running());
        assert_eq!(scanner.count(), None);
    }

    #[test]
    fn test_counts_regular_files_and_skips_git() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "hello").unwrap();
        fs::create_dir_all(temp.path().join("sub").join("deeper")).unwrap();
        fs::write(temp.path().join("sub").join("b.txt"), "world").unwrap();
        fs::write(temp.path().join("sub").join("deeper").join("c.txt"), "!").unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        fs::write(temp.path().join(".git").join("HEAD"), "ref").unwrap();

        let mut scanner = DirectoryScanner::new();
        scanner.start(temp.path());
        wait_until_done(&scanner);

        assert_eq!(scanner.count(), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_counted() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "hello").unwrap();
        std::os::unix::fs::symlink(temp.path().join("a.txt"), temp.path().join("link")).unwrap();

        let mut scanner = DirectoryScanner::new();
        scanner.start(temp.path());
        wait_until_done(&scanner);

        assert_eq!(scanner.count(), Some(1));
    }

    #[test]
    fn test_cancel_before_walk_leaves_count_unknown() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "hello").unwrap();

        let mut scanner = DirectoryScanner::new();
        // Cancellation requested up front is observed at the first entry
        scanner.stop();
        scanner.start(temp.path());
        wait_until_done(&scanner);

        assert_eq!(scanner.count(), None);
    }

    #[test]
    fn test_cancel_mid_walk_leaves_count_unknown() {
        let temp = TempDir::new().unwrap();
        for dir in 0..5 {
            let sub = temp.path().join(format!("d{}", dir));
            fs::create_dir(&sub).unwrap();
            for file in 0..10 {
                fs::write(sub.join(format!("f{}", file)), "x").unwrap();
            }
        }

        let mut scanner = DirectoryScanner::new();
        let cancel = Arc::clone(&scanner.cancel);
        let polls = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&polls);

        // stop() lands while the walk is at its 5th entry
        scanner.start_with(temp.path(), move || {
            if seen.fetch_add(1, Ordering::SeqCst) == 4 {
                cancel.store(true, Ordering::Release);
            }
            cancel.load(Ordering::Acquire)
        });
        wait_until_done(&scanner);

        assert_eq!(scanner.count(), None);
        assert!(!scanner.is_running());
        assert_eq!(polls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_count_files_stops_when_asked() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "hello").unwrap();

        assert_eq!(count_files(temp.path(), || false), Some(1));
        assert_eq!(count_files(temp.path(), || true), None);
    }

    #[test]
    fn test_state_handle_tracks_scanner() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "hello").unwrap();

        let mut scanner = DirectoryScanner::new();
        let state = scanner.state();
        scanner.start(temp.path());
        wait_until_done(&scanner);

        assert!(!state.is_scanning());
        assert_eq!(state.total(), Some(1));
    }
}
