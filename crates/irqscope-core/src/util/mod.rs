//! Utility modules for irqscope.

mod duration_parser;

pub use duration_parser::parse_duration;
