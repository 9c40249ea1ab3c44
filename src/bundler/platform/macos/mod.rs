//! macOS bundling.

pub mod delocate;
