//! Hardware interrupt collector: `/proc/interrupts` and `/proc/irq/<N>/`.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::collector::procfs::parser::{InterruptTable, parse_interrupts};
use crate::collector::traits::FileSystem;
use crate::cpuset::CpuSet;
use crate::error::CollectError;
use crate::stats::Stats;

/// One hardware interrupt and where it may run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrqInfo {
    pub irq: u32,
    /// Device/driver label, empty when the kernel does not report one.
    pub source: String,
    /// CPUs the IRQ is allowed to run on (`smp_affinity_list`).
    pub cpus: CpuSet,
    /// CPUs actually in use (`effective_affinity_list`), when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_cpus: Option<CpuSet>,
}

impl IrqInfo {
    /// Narrows both affinity sets to `cpus`.
    ///
    /// Returns `None` when the IRQ cannot run on any selected CPU: the
    /// effective set decides when `by_effective` is set and the kernel
    /// reported one, the allowed set otherwise.
    pub fn restrict_to(&self, cpus: &CpuSet, by_effective: bool) -> Option<IrqInfo> {
        let allowed = self.cpus.intersection(cpus);
        let effective = self
            .effective_cpus
            .as_ref()
            .map(|effective| effective.intersection(cpus));

        let gate = match (&effective, by_effective) {
            (Some(effective), true) => effective,
            _ => &allowed,
        };
        if gate.is_empty() {
            return None;
        }

        Some(IrqInfo {
            irq: self.irq,
            source: self.source.clone(),
            cpus: allowed,
            effective_cpus: effective,
        })
    }
}

/// Reads interrupt counters and IRQ affinities.
pub struct IrqCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> IrqCollector<F> {
    /// Creates a new IRQ collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    /// Reads and parses `/proc/interrupts`.
    pub fn read_table(&self) -> Result<InterruptTable, CollectError> {
        let path = PathBuf::from(format!("{}/interrupts", self.proc_path));
        let content = self
            .fs
            .read_to_string(&path)
            .map_err(|e| CollectError::io(&path, e))?;
        parse_interrupts(&content).map_err(|e| CollectError::parse(&path, e))
    }

    /// Takes a fresh counter snapshot.
    ///
    /// System-wide rows (`ERR`, `MIS`) have no CPU to attribute to and are
    /// only logged.
    pub fn read_stats(&self) -> Result<Stats, CollectError> {
        let table = self.read_table()?;
        for (label, value) in table.aggregates.iter().filter(|(_, v)| **v > 0) {
            debug!(label = %label, value, "system-wide interrupt counter");
        }
        Ok(table.stats)
    }

    /// Builds the IRQ -> {source, CPUs} index, sorted by IRQ number.
    ///
    /// Every numeric directory under `/proc/irq` yields one entry; IRQs that
    /// exist only in the counter table are skipped. Any affinity file that
    /// cannot be read or parsed fails the whole read.
    pub fn read_info(&self, with_effective: bool) -> Result<Vec<IrqInfo>, CollectError> {
        let table = self.read_table()?;

        let irq_root = PathBuf::from(format!("{}/irq", self.proc_path));
        let entries = self
            .fs
            .read_dir(&irq_root)
            .map_err(|e| CollectError::io(&irq_root, e))?;

        let mut infos = Vec::new();
        for entry in entries {
            let Some(irq) = numeric_name(&entry) else {
                continue;
            };
            if !self.fs.is_dir(&entry) {
                continue;
            }

            let cpus = self.read_affinity(&entry.join("smp_affinity_list"))?;
            let effective_cpus = if with_effective {
                Some(self.read_affinity(&entry.join("effective_affinity_list"))?)
            } else {
                None
            };

            let source = match table.sources.get(&irq) {
                Some(source) if !source.is_empty() => source.clone(),
                _ => self.handler_name(&entry).unwrap_or_default(),
            };

            infos.push(IrqInfo {
                irq,
                source,
                cpus,
                effective_cpus,
            });
        }

        infos.sort_by_key(|info| info.irq);
        debug!(
            irqs = infos.len(),
            counted = table.sources.len(),
            "resolved IRQ affinities"
        );
        Ok(infos)
    }

    fn read_affinity(&self, path: &Path) -> Result<CpuSet, CollectError> {
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| CollectError::io(path, e))?;
        CpuSet::parse(&content).map_err(|e| CollectError::parse(path, e))
    }

    /// Name of the first handler subdirectory the kernel registered for the IRQ.
    fn handler_name(&self, irq_dir: &Path) -> Option<String> {
        let mut handlers: Vec<String> = self
            .fs
            .read_dir(irq_dir)
            .ok()?
            .into_iter()
            .filter(|path| self.fs.is_dir(path))
            .filter_map(|path| path.file_name()?.to_str().map(str::to_string))
            .collect();
        handlers.sort();
        handlers.into_iter().next()
    }
}

fn numeric_name(path: &Path) -> Option<u32> {
    path.file_name()?.to_str()?.parse().ok()
}
