//! Periodic re-sampling of interrupt counters.
//!
//! The watcher takes an initial snapshot, then re-reads its source once per
//! period until the tick budget is spent or the shared `running` flag is
//! cleared. Each tick hands the previous and current snapshot to the
//! reporter; the session always ends with one summary against the initial
//! snapshot, cancelled or not.
//!
//! ```text
//! Init ──► Sampling ⇄ Reporting ──► Done
//!             │                      ▲
//!             └──── cancelled ───────┘
//! ```

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info};

use crate::collector::traits::FileSystem;
use crate::collector::{IrqCollector, SoftirqCollector};
use crate::error::CollectError;
use crate::report::Reporter;
use crate::stats::Stats;

/// Upper bound on how long the loop sleeps before re-checking cancellation.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Anything that can produce a fresh counter snapshot.
pub trait StatsSource {
    fn snapshot(&mut self) -> Result<Stats, CollectError>;
}

impl<F: FileSystem> StatsSource for IrqCollector<F> {
    fn snapshot(&mut self) -> Result<Stats, CollectError> {
        self.read_stats()
    }
}

impl<F: FileSystem> StatsSource for SoftirqCollector<F> {
    fn snapshot(&mut self) -> Result<Stats, CollectError> {
        self.read_stats()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Time between two samples.
    pub period: Duration,
    /// Number of ticks before stopping. Negative runs until cancelled,
    /// zero skips sampling entirely.
    pub max_ticks: i64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            max_ticks: -1,
        }
    }
}

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOutcome {
    pub ticks: u64,
    pub cancelled: bool,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub enum WatchError {
    /// A snapshot could not be taken.
    Collect(CollectError),
    /// The report could not be written.
    Report(io::Error),
}

impl std::fmt::Display for WatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchError::Collect(e) => write!(f, "{}", e),
            WatchError::Report(e) => write!(f, "failed to write report: {}", e),
        }
    }
}

impl std::error::Error for WatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WatchError::Collect(e) => Some(e),
            WatchError::Report(e) => Some(e),
        }
    }
}

impl From<CollectError> for WatchError {
    fn from(e: CollectError) -> Self {
        WatchError::Collect(e)
    }
}

impl From<io::Error> for WatchError {
    fn from(e: io::Error) -> Self {
        WatchError::Report(e)
    }
}

/// Drives a [`StatsSource`] on a fixed period.
pub struct Watcher<S: StatsSource> {
    source: S,
    config: WatchConfig,
}

impl<S: StatsSource> Watcher<S> {
    pub fn new(source: S, config: WatchConfig) -> Self {
        Self { source, config }
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Runs one watch session to completion.
    ///
    /// Any read or write failure aborts the session without a summary.
    /// Clearing `running` ends the loop at the next poll and still emits
    /// the summary.
    pub fn run<W: Write>(
        &mut self,
        reporter: &mut Reporter<W>,
        running: &AtomicBool,
    ) -> Result<WatchOutcome, WatchError> {
        let init = self.source.snapshot()?;
        let start = Instant::now();
        let mut prev = init.clone();
        let mut ticks: u64 = 0;
        let mut cancelled = false;

        debug!(
            period = ?self.config.period,
            max_ticks = self.config.max_ticks,
            cpus = init.len(),
            "watch started"
        );

        if self.config.max_ticks != 0 {
            let period = self.config.period.max(Duration::from_millis(1));
            let mut deadline = start + period;

            loop {
                if !wait_until(deadline, running) {
                    cancelled = true;
                    break;
                }

                let last = self.source.snapshot()?;
                reporter.delta(Utc::now(), &prev, &last)?;
                prev = last;
                ticks += 1;

                if self.config.max_ticks > 0 && ticks >= self.config.max_ticks as u64 {
                    break;
                }

                deadline = next_deadline(deadline, Instant::now(), period);
            }
        }

        let elapsed = start.elapsed();
        if cancelled {
            info!(ticks, "watch cancelled");
        }
        reporter.summary(elapsed, &init, &prev)?;

        Ok(WatchOutcome {
            ticks,
            cancelled,
            elapsed,
        })
    }
}

/// The first tick boundary after `now`, stepping from `deadline` by `period`.
///
/// Ticks missed during a slow read are dropped, keeping the original phase.
fn next_deadline(deadline: Instant, now: Instant, period: Duration) -> Instant {
    let next = deadline + period;
    if next > now {
        return next;
    }
    let behind = now.duration_since(next);
    let period_nanos = period.as_nanos();
    let missed = behind.as_nanos() / period_nanos + 1;
    let into_period = behind.as_nanos() % period_nanos;
    debug!(missed = missed as u64, "sampling fell behind");
    // into_period < period, so the remainder always fits the period's range.
    let offset = Duration::new(
        (into_period / 1_000_000_000) as u64,
        (into_period % 1_000_000_000) as u32,
    );
    now + (period - offset)
}

/// Sleeps until `deadline` in slices of [`POLL_INTERVAL`].
///
/// Returns `false` as soon as `running` is observed cleared, including when
/// the deadline has already passed.
fn wait_until(deadline: Instant, running: &AtomicBool) -> bool {
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(POLL_INTERVAL));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpuset::CpuSet;
    use crate::report::{OutputFormat, SummaryRecord, TickRecord};
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Arc;

    /// Replays a fixed list of snapshots, repeating the last one.
    struct Scripted {
        script: VecDeque<Result<Stats, CollectError>>,
        last: Stats,
        reads: usize,
    }

    impl Scripted {
        fn new(script: Vec<Result<Stats, CollectError>>) -> Self {
            Self {
                script: script.into(),
                last: Stats::new(),
                reads: 0,
            }
        }
    }

    impl StatsSource for Scripted {
        fn snapshot(&mut self) -> Result<Stats, CollectError> {
            self.reads += 1;
            match self.script.pop_front() {
                Some(Ok(stats)) => {
                    self.last = stats.clone();
                    Ok(stats)
                }
                Some(Err(e)) => Err(e),
                None => Ok(self.last.clone()),
            }
        }
    }

    fn snapshot(values: &[(u32, &str, u64)]) -> Stats {
        let mut stats = Stats::new();
        for &(cpu, label, value) in values {
            stats.set(cpu, label, value);
        }
        stats
    }

    fn json_reporter(verbose: u8) -> Reporter<Vec<u8>> {
        Reporter::new(
            OutputFormat::Json,
            verbose,
            CpuSet::parse("0-3").unwrap(),
            Vec::new(),
        )
    }

    fn config(period_ms: u64, max_ticks: i64) -> WatchConfig {
        WatchConfig {
            period: Duration::from_millis(period_ms),
            max_ticks,
        }
    }

    #[test]
    fn test_default_config() {
        let config = WatchConfig::default();
        assert_eq!(config.period, Duration::from_secs(1));
        assert_eq!(config.max_ticks, -1);
    }

    #[test]
    fn test_ticks_and_summary() {
        let source = Scripted::new(vec![
            Ok(snapshot(&[(0, "1", 10), (1, "1", 5)])),
            Ok(snapshot(&[(0, "1", 12), (1, "1", 5)])),
            Ok(snapshot(&[(0, "1", 15), (1, "1", 9)])),
        ]);
        let mut watcher = Watcher::new(source, config(10, 2));
        let mut reporter = json_reporter(2);
        let running = AtomicBool::new(true);

        let outcome = watcher.run(&mut reporter, &running).unwrap();
        assert_eq!(outcome.ticks, 2);
        assert!(!outcome.cancelled);
        assert_eq!(watcher.into_source().reads, 3);

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);

        let first: TickRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.counters, snapshot(&[(0, "1", 2)]));
        let second: TickRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.counters, snapshot(&[(0, "1", 3), (1, "1", 4)]));

        let summary: SummaryRecord = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(summary.counters, snapshot(&[(0, "1", 5), (1, "1", 4)]));
    }

    #[test]
    fn test_zero_ticks_reads_once() {
        let source = Scripted::new(vec![Ok(snapshot(&[(0, "1", 10)]))]);
        let mut watcher = Watcher::new(source, config(10, 0));
        let mut reporter = json_reporter(2);
        let running = AtomicBool::new(true);

        let outcome = watcher.run(&mut reporter, &running).unwrap();
        assert_eq!(outcome.ticks, 0);
        assert_eq!(watcher.into_source().reads, 1);

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(out.lines().count(), 1);
        let summary: SummaryRecord = serde_json::from_str(out.trim()).unwrap();
        assert!(summary.counters.is_empty());
    }

    #[test]
    fn test_cancelled_before_first_tick() {
        let source = Scripted::new(vec![Ok(snapshot(&[(0, "1", 10)]))]);
        let mut watcher = Watcher::new(source, config(10, -1));
        let mut reporter = json_reporter(1);
        let running = AtomicBool::new(false);

        let outcome = watcher.run(&mut reporter, &running).unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.ticks, 0);

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        let summary: SummaryRecord = serde_json::from_str(out.trim()).unwrap();
        assert!(summary.counters.is_empty());
    }

    #[test]
    fn test_cancel_while_running() {
        let source = Scripted::new(vec![
            Ok(snapshot(&[(2, "9", 1)])),
            Ok(snapshot(&[(2, "9", 4)])),
        ]);
        let mut watcher = Watcher::new(source, config(20, -1));
        let mut reporter = json_reporter(1);
        let running = Arc::new(AtomicBool::new(true));

        let flag = running.clone();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(150));
            flag.store(false, Ordering::SeqCst);
        });

        let outcome = watcher.run(&mut reporter, &running).unwrap();
        stopper.join().unwrap();
        assert!(outcome.cancelled);
        assert!(outcome.ticks >= 1);

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        let summary: SummaryRecord = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(summary.counters, snapshot(&[(2, "9", 3)]));
    }

    #[test]
    fn test_read_error_aborts_without_summary() {
        let failure = CollectError::io(
            PathBuf::from("/proc/interrupts"),
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        let source = Scripted::new(vec![Ok(snapshot(&[(0, "1", 1)])), Err(failure)]);
        let mut watcher = Watcher::new(source, config(10, 5));
        let mut reporter = json_reporter(2);
        let running = AtomicBool::new(true);

        let err = watcher.run(&mut reporter, &running).unwrap_err();
        assert!(matches!(err, WatchError::Collect(_)));
        assert!(err.to_string().contains("/proc/interrupts"));
        assert!(reporter.get_ref().is_empty());
    }

    #[test]
    fn test_init_error() {
        let failure = CollectError::io(
            PathBuf::from("/proc/softirqs"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let mut watcher = Watcher::new(Scripted::new(vec![Err(failure)]), config(10, 1));
        let mut reporter = json_reporter(2);
        let running = AtomicBool::new(true);
        assert!(watcher.run(&mut reporter, &running).is_err());
    }

    #[test]
    fn test_collector_sources() {
        use crate::collector::MockFs;

        let mut irqs = IrqCollector::new(MockFs::typical_system(), "/proc");
        assert_eq!(irqs.snapshot().unwrap().get(3, "12"), Some(713));

        let mut softirqs = SoftirqCollector::new(MockFs::typical_system(), "/proc");
        assert!(softirqs.snapshot().unwrap().get(0, "TIMER").is_some());
    }

    #[test]
    fn test_next_deadline() {
        let base = Instant::now();
        let period = Duration::from_millis(10);

        // On schedule: one period later.
        assert_eq!(next_deadline(base, base, period), base + period);

        // Read overran by 25ms: skip missed ticks, keep the 10ms phase.
        let now = base + Duration::from_millis(35);
        assert_eq!(next_deadline(base, now, period), base + Duration::from_millis(40));

        // Landing exactly on a boundary moves to the following one.
        let now = base + Duration::from_millis(20);
        assert_eq!(next_deadline(base, now, period), base + Duration::from_millis(30));
    }

    #[test]
    fn test_next_deadline_long_stall() {
        let base = Instant::now();
        let period = Duration::from_nanos(1);
        let now = base + Duration::from_secs(60 * 60 * 24 * 365);
        let next = next_deadline(base, now, period);
        assert!(next > now);
        assert!(next - now <= period);
    }

    #[test]
    fn test_wait_until() {
        let running = AtomicBool::new(true);
        let started = Instant::now();
        assert!(wait_until(started + Duration::from_millis(30), &running));
        assert!(started.elapsed() >= Duration::from_millis(30));

        running.store(false, Ordering::SeqCst);
        assert!(!wait_until(Instant::now(), &running));
    }
}
