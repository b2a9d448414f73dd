//! Software interrupt collector: `/proc/softirqs`.

use std::path::PathBuf;

use crate::collector::procfs::parser::{SoftirqInfo, parse_softirqs};
use crate::collector::traits::FileSystem;
use crate::error::CollectError;
use crate::stats::Stats;

/// Softirq categories defined by current kernels, in display order.
///
/// The parser accepts any name; see [`SoftirqInfo::display_names`].
pub const SOFTIRQ_NAMES: [&str; 10] = [
    "HI", "TIMER", "NET_TX", "NET_RX", "BLOCK", "IRQ_POLL", "TASKLET", "SCHED", "HRTIMER", "RCU",
];

impl SoftirqInfo {
    /// Category names for display: the known ones in [`SOFTIRQ_NAMES`]
    /// order, then any others in table order.
    pub fn display_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = SOFTIRQ_NAMES
            .iter()
            .copied()
            .filter(|name| self.counters(name).is_some())
            .collect();
        names.extend(self.names().filter(|name| !SOFTIRQ_NAMES.contains(name)));
        names
    }
}

/// Reads softirq counters.
pub struct SoftirqCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> SoftirqCollector<F> {
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    /// Reads and parses `/proc/softirqs`.
    pub fn read_info(&self) -> Result<SoftirqInfo, CollectError> {
        let path = PathBuf::from(format!("{}/softirqs", self.proc_path));
        let content = self
            .fs
            .read_to_string(&path)
            .map_err(|e| CollectError::io(&path, e))?;
        parse_softirqs(&content).map_err(|e| CollectError::parse(&path, e))
    }

    /// Takes a fresh snapshot in the CPU-indexed shape.
    pub fn read_stats(&self) -> Result<Stats, CollectError> {
        Ok(self.read_info()?.to_stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn test_read_info() {
        let collector = SoftirqCollector::new(MockFs::typical_system(), "/proc");
        let info = collector.read_info().unwrap();
        assert_eq!(info.get("TIMER", 0), Some(128764));
        let names: Vec<&str> = info.names().collect();
        assert_eq!(names, SOFTIRQ_NAMES);
        assert_eq!(info.used_cpus("NET_RX").to_string(), "0-3");
        assert!(info.used_cpus("HRTIMER").is_empty());
    }

    #[test]
    fn test_read_stats() {
        let collector = SoftirqCollector::new(MockFs::typical_system(), "/proc");
        let stats = collector.read_stats().unwrap();
        assert_eq!(stats.get(2, "SCHED"), Some(406115));
    }

    #[test]
    fn test_malformed_table() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/softirqs", "CPU0 CPU1\n HI: 1\n");
        let err = SoftirqCollector::new(fs, "/proc").read_info().unwrap_err();
        assert!(matches!(err, CollectError::Parse { .. }));
    }

    #[test]
    fn test_display_names() {
        let mut fs = MockFs::new();
        fs.add_file(
            "/proc/softirqs",
            "    CPU0 CPU1\n  RCU: 1 2\n NEW_CAT: 0 3\n TIMER: 4 5\n   HI: 0 0\n",
        );
        let info = SoftirqCollector::new(fs, "/proc").read_info().unwrap();
        assert_eq!(info.names().collect::<Vec<_>>(), vec!["RCU", "NEW_CAT", "TIMER", "HI"]);
        assert_eq!(info.display_names(), vec!["HI", "TIMER", "RCU", "NEW_CAT"]);
    }
}
