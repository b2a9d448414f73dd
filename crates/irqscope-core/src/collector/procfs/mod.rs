//! Collectors for the Linux `/proc` filesystem.
//!
//! Parsers live in [`parser`] as pure functions over file content; the
//! collectors read the pseudo-files through a [`FileSystem`](super::FileSystem).

pub mod irqs;
pub mod parser;
pub mod procs;
pub mod softirqs;

pub use irqs::{IrqCollector, IrqInfo};
pub use parser::{InterruptTable, SoftirqInfo, TaskStatus};
pub use procs::{PidInfo, ProcCollector, TidInfo};
pub use softirqs::{SOFTIRQ_NAMES, SoftirqCollector};
