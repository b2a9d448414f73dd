//! Kernel pseudo-file collectors.
//!
//! All reads go through the [`FileSystem`] trait so collectors work against
//! the real `/proc` and `/sys` trees or an in-memory [`MockFs`].
//!
//! ```text
//! IrqCollector      ─┐
//! SoftirqCollector  ─┤
//! ProcCollector     ─┼──► FileSystem ──► RealFs | MockFs
//! SysCollector      ─┘
//! ```
//!
//! # Usage
//!
//! ```
//! use irqscope_core::collector::{IrqCollector, MockFs};
//!
//! let collector = IrqCollector::new(MockFs::typical_system(), "/proc");
//! let stats = collector.read_stats().unwrap();
//! assert_eq!(stats.get(0, "131"), Some(3949116));
//! ```

pub mod mock;
pub mod procfs;
mod sysfs;
pub mod traits;

pub use mock::MockFs;
pub use procfs::{
    IrqCollector, IrqInfo, PidInfo, ProcCollector, SOFTIRQ_NAMES, SoftirqCollector, SoftirqInfo,
    TidInfo,
};
pub use sysfs::SysCollector;
pub use traits::{FileSystem, RealFs};
