//! irqscope - interrupt and CPU affinity inspection library.
//!
//! This library provides the core shared by the `irqscope` binary:
//! - [`cpuset`] - canonical CPU list sets (`"0-3,8"`)
//! - [`collector`] - `/proc` and `/sys` readers behind a mockable filesystem
//! - [`stats`] - per-CPU counter snapshots and deltas
//! - [`watch`] - the periodic sampling loop
//! - [`report`] - text and JSON output

pub mod collector;
pub mod cpuset;
pub mod error;
pub mod fmt;
pub mod report;
pub mod stats;
pub mod util;
pub mod watch;

/// Package version with the short git SHA of the build.
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_SHA"), ")");
