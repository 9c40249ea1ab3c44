//! Wheel building, discovery and inspection.

pub mod build;
pub mod discover;
pub mod inspect;

pub use build::build_wheel;
pub use discover::find_single_wheel;
pub use inspect::bundled_libraries;
