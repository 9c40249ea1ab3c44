//! Linux bundling.

pub mod auditwheel;
