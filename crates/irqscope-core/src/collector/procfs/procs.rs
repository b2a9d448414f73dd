//! Thread affinity collector: `/proc/<pid>/task/<tid>/status`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::collector::procfs::parser::parse_task_status;
use crate::collector::traits::FileSystem;
use crate::cpuset::CpuSet;
use crate::error::CollectError;

/// One thread and the CPUs it may run on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TidInfo {
    pub tid: u32,
    pub name: String,
    pub affinity: CpuSet,
}

/// One process and its threads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PidInfo {
    pub pid: u32,
    pub name: String,
    pub tids: BTreeMap<u32, TidInfo>,
}

impl PidInfo {
    /// Union of the affinities of all threads.
    pub fn affinity(&self) -> CpuSet {
        self.tids
            .values()
            .fold(CpuSet::new(), |acc, tid| acc.union(&tid.affinity))
    }
}

/// Reads per-thread CPU affinity of processes.
pub struct ProcCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> ProcCollector<F> {
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    /// Reads every thread of one process.
    pub fn read_pid(&self, pid: u32) -> Result<PidInfo, CollectError> {
        let dir = PathBuf::from(format!("{}/{}", self.proc_path, pid));
        let tids = self.read_tasks(&dir)?;
        Ok(Self::pid_info(pid, tids))
    }

    /// Reads every thread of the calling process (`/proc/self`).
    pub fn read_self(&self) -> Result<PidInfo, CollectError> {
        let dir = PathBuf::from(format!("{}/self", self.proc_path));
        let tids = self.read_tasks(&dir)?;
        let pid = tids.keys().next().copied().unwrap_or_default();
        Ok(Self::pid_info(pid, tids))
    }

    /// Reads every process, skipping the ones that exit during the scan.
    pub fn list_all(&self) -> Result<BTreeMap<u32, PidInfo>, CollectError> {
        let root = PathBuf::from(&self.proc_path);
        let entries = self
            .fs
            .read_dir(&root)
            .map_err(|e| CollectError::io(&root, e))?;

        let mut pids: Vec<u32> = entries
            .iter()
            .filter_map(|path| path.file_name()?.to_str()?.parse().ok())
            .collect();
        pids.sort_unstable();

        let mut infos = BTreeMap::new();
        for pid in pids {
            match self.read_pid(pid) {
                Ok(info) => {
                    infos.insert(pid, info);
                }
                Err(e) if e.is_not_found() => {
                    debug!(pid, "process disappeared during scan");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(infos)
    }

    fn read_tasks(&self, proc_dir: &Path) -> Result<BTreeMap<u32, TidInfo>, CollectError> {
        let task_dir = proc_dir.join("task");
        let entries = self
            .fs
            .read_dir(&task_dir)
            .map_err(|e| CollectError::io(&task_dir, e))?;

        let mut tids = BTreeMap::new();
        for entry in entries {
            let Some(tid) = entry
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.parse::<u32>().ok())
            else {
                continue;
            };

            let status_path = entry.join("status");
            let content = self
                .fs
                .read_to_string(&status_path)
                .map_err(|e| CollectError::io(&status_path, e))?;
            let status =
                parse_task_status(&content).map_err(|e| CollectError::parse(&status_path, e))?;

            tids.insert(
                tid,
                TidInfo {
                    tid,
                    name: status.name,
                    affinity: status.cpus_allowed,
                },
            );
        }
        Ok(tids)
    }

    fn pid_info(pid: u32, tids: BTreeMap<u32, TidInfo>) -> PidInfo {
        let name = tids
            .get(&pid)
            .or_else(|| tids.values().next())
            .map(|tid| tid.name.clone())
            .unwrap_or_default();
        PidInfo { pid, name, tids }
    }
}
