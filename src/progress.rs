//! Live progress reporting: "processed / discovered" on a redrawing line

use crate::scanner::TotalCount;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

/// Default cadence of status emissions.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Count of files checksummed so far. One writer, many readers.
#[derive(Debug, Default)]
pub struct ProgressCounter(AtomicU64);

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Render the status line for the current counters.
///
/// The percentage is not clamped: a processed count racing past the total
/// shows up as more than 100%.
pub fn render_status(processed: u64, scan: &dyn TotalCount) -> String {
    if scan.is_scanning() {
        return format!("status: {}/?, scan in progress...", processed);
    }

    match scan.total() {
        Some(0) => format!("status: {}/0 (100.00%)", processed),
        Some(total) => {
            let percentage = 100.0 * processed as f64 / total as f64;
            format!("status: {}/{} ({:.2}%)", processed, total, percentage)
        }
        None => format!("status: {}/? (scan incomplete)", processed),
    }
}

/// Create a single-line bar that shows only its message
pub fn create_status_line() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}

/// Log sink that clears the status line while a record is written and
/// redraws it afterwards, so warnings never land in the middle of it.
pub struct StatusLineLog<M = fn() -> io::Stderr> {
    bar: ProgressBar,
    inner: M,
}

impl StatusLineLog {
    pub fn stderr(bar: ProgressBar) -> Self {
        Self::new(bar, io::stderr)
    }
}

impl<M> StatusLineLog<M> {
    pub fn new(bar: ProgressBar, inner: M) -> Self {
        Self { bar, inner }
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for StatusLineLog<M> {
    type Writer = SuspendedWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SuspendedWriter {
            bar: self.bar.clone(),
            inner: self.inner.make_writer(),
        }
    }
}

/// One log record's writer, see [`StatusLineLog`].
pub struct SuspendedWriter<W> {
    bar: ProgressBar,
    inner: W,
}

impl<W: io::Write> io::Write for SuspendedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = &mut self.inner;
        self.bar.suspend(|| inner.write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let inner = &mut self.inner;
        self.bar.suspend(|| inner.write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        let inner = &mut self.inner;
        self.bar.suspend(|| inner.flush())
    }
}

/// Periodically redraws the status line from the processed counter and scan state.
pub struct ProgressAggregator {
    processed: Arc<ProgressCounter>,
    scan: Arc<dyn TotalCount>,
    bar: ProgressBar,
    interval: Duration,
    quit: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ProgressAggregator {
    pub fn new(processed: Arc<ProgressCounter>, scan: Arc<dyn TotalCount>, bar: ProgressBar) -> Self {
        Self {
            processed,
            scan,
            bar,
            interval: DEFAULT_INTERVAL,
            quit: None,
            handle: None,
        }
    }

    /// Override the emission cadence.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Current status line, computed fresh.
    pub fn status(&self) -> String {
        render_status(self.processed.get(), self.scan.as_ref())
    }

    /// Draw the first status line and start the emission loop.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }

        self.bar.set_message(self.status());

        let (quit_tx, quit_rx) = mpsc::channel::<()>();
        let processed = Arc::clone(&self.processed);
        let scan = Arc::clone(&self.scan);
        let bar = self.bar.clone();
        let interval = self.interval;

        self.quit = Some(quit_tx);
        self.handle = Some(thread::spawn(move || loop {
            match quit_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    bar.set_message(render_status(processed.get(), scan.as_ref()));
                }
                // Stop was requested or the aggregator was dropped
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }));
    }

    /// Halt emissions. Waits for an in-flight redraw to finish.
    pub fn stop(&mut self) {
        if let Some(quit) = self.quit.take() {
            let _ = quit.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Print one last snapshot and leave it on screen.
    pub fn print_final(&self) {
        self.bar.finish_with_message(self.status());
    }

    /// Last message drawn on the status line
    pub fn last_emitted(&self) -> String {
        self.bar.message()
    }
}

impl Drop for ProgressAggregator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Default)]
    struct MockScan {
        scanning: AtomicBool,
        total: Mutex<Option<u64>>,
    }

    impl MockScan {
        fn finish(&self, total: u64) {
            *self.total.lock().unwrap() = Some(total);
            self.scanning.store(false, Ordering::SeqCst);
        }
    }

    impl TotalCount for MockScan {
        fn is_scanning(&self) -> bool {
            self.scanning.load(Ordering::SeqCst)
        }

        fn total(&self) -> Option<u64> {
            *self.total.lock().unwrap()
        }
    }

    fn scanning_mock() -> Arc<MockScan> {
        let scan = MockScan::default();
        scan.scanning.store(true, Ordering::SeqCst);
        Arc::new(scan)
    }

    fn wait_for_message(agg: &ProgressAggregator, expected: &str) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while agg.last_emitted() != expected {
            assert!(
                Instant::now() < deadline,
                "status never became '{}', last was '{}'",
                expected,
                agg.last_emitted()
            );
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_render_scanning_form() {
        let scan = scanning_mock();
        assert_eq!(render_status(7, &*scan), "status: 7/?, scan in progress...");
    }

    #[test]
    fn test_render_total_form() {
        let scan = MockScan::default();
        scan.finish(10);
        assert_eq!(render_status(5, &scan), "status: 5/10 (50.00%)");
        assert_eq!(render_status(0, &scan), "status: 0/10 (0.00%)");
    }

    #[test]
    fn test_render_not_clamped() {
        let scan = MockScan::default();
        scan.finish(2000);
        assert_eq!(render_status(2002, &scan), "status: 2002/2000 (100.10%)");
    }

    #[test]
    fn test_render_edge_totals() {
        let scan = MockScan::default();
        scan.finish(0);
        assert_eq!(render_status(0, &scan), "status: 0/0 (100.00%)");

        // Stopped without a final count
        let cancelled = MockScan::default();
        assert_eq!(render_status(3, &cancelled), "status: 3/? (scan incomplete)");
    }

    #[test]
    fn test_counter() {
        let counter = ProgressCounter::new();
        assert_eq!(counter.get(), 0);
        counter.increment();
        counter.increment();
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_aggregator_follows_scanner() {
        let scan = scanning_mock();
        let processed = Arc::new(ProgressCounter::new());

        let mut agg = ProgressAggregator::new(Arc::clone(&processed), scan.clone(), ProgressBar::hidden())
            .with_interval(Duration::from_millis(5));
        agg.start();
        assert_eq!(agg.last_emitted(), "status: 0/?, scan in progress...");

        for _ in 0..5 {
            processed.increment();
        }
        wait_for_message(&agg, "status: 5/?, scan in progress...");

        scan.finish(10);
        wait_for_message(&agg, "status: 5/10 (50.00%)");

        agg.stop();
    }

    #[test]
    fn test_stop_halts_emissions() {
        let scan = scanning_mock();
        let processed = Arc::new(ProgressCounter::new());

        let mut agg = ProgressAggregator::new(Arc::clone(&processed), scan.clone(), ProgressBar::hidden())
            .with_interval(Duration::from_millis(5));
        agg.start();
        agg.stop();

        processed.increment();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(agg.last_emitted(), "status: 0/?, scan in progress...");

        agg.print_final();
        assert_eq!(agg.last_emitted(), "status: 1/?, scan in progress...");
    }

    #[test]
    fn test_log_lines_pass_through_status_line() {
        let bar = ProgressBar::hidden();
        bar.set_message("status: 3/?, scan in progress...");
        let log = StatusLineLog::new(bar.clone(), Mutex::new(Vec::new()));

        {
            let mut writer = log.make_writer();
            writer.write_all(b"WARN skipping non regular file link\n").unwrap();
            assert_eq!(writer.write(b"x").unwrap(), 1);
            writer.flush().unwrap();
        }

        assert_eq!(
            log.inner.lock().unwrap().as_slice(),
            b"WARN skipping non regular file link\nx"
        );
        assert_eq!(bar.message(), "status: 3/?, scan in progress...");
        assert!(!bar.is_finished());
    }
}
