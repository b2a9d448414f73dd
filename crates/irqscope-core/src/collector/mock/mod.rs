//! Mock filesystem and fixtures for tests.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
pub use scenarios::{TYPICAL_INTERRUPTS, TYPICAL_SOFTIRQS, render_interrupts};
