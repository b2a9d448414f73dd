//! Collector for the `/sys` CPU topology files.

use std::path::PathBuf;

use crate::collector::traits::FileSystem;
use crate::cpuset::CpuSet;
use crate::error::CollectError;

/// Reads CPU topology from sysfs.
pub struct SysCollector<F: FileSystem> {
    fs: F,
    sys_path: String,
}

impl<F: FileSystem> SysCollector<F> {
    /// Creates a new sysfs collector rooted at `sys_path` (usually "/sys").
    pub fn new(fs: F, sys_path: impl Into<String>) -> Self {
        Self {
            fs,
            sys_path: sys_path.into(),
        }
    }

    /// CPUs currently online (`devices/system/cpu/online`).
    pub fn online_cpus(&self) -> Result<CpuSet, CollectError> {
        let path = PathBuf::from(format!("{}/devices/system/cpu/online", self.sys_path));
        let content = self
            .fs
            .read_to_string(&path)
            .map_err(|e| CollectError::io(&path, e))?;
        CpuSet::parse(&content).map_err(|e| CollectError::parse(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn test_online_cpus() {
        let collector = SysCollector::new(MockFs::typical_system(), "/sys");
        assert_eq!(collector.online_cpus().unwrap().to_string(), "0-3");
    }

    #[test]
    fn test_online_cpus_missing() {
        let collector = SysCollector::new(MockFs::new(), "/sys");
        assert!(collector.online_cpus().unwrap_err().is_not_found());
    }
}
