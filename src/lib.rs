//! camera-runtime
//!
//! Process-wide lifecycle manager for a hardware-backed camera stack. The
//! library pieces live in the `camrt-*` workspace crates; this crate hosts the
//! `camrt` probe binary.

pub mod report;
pub mod runner;

// Re-export main entry points
pub use runner::{probe, run, RunOptions};
