//! Configuration structures for the wheel pipeline.
//!
//! This module provides the validated [`Settings`] consumed by every step,
//! the [`SettingsBuilder`] that constructs them, and the small enums that
//! select interpreter versions, build backends and repair tools.

mod builder;
mod core;
mod python;
mod tools;

// Re-export all public types
pub use builder::SettingsBuilder;
pub use core::{Settings, SmokeTest};
pub use python::PythonVersion;
pub use tools::{BuildBackend, RepairTool};
