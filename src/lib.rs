//! Build driver for self-contained binary wheels
//!
//! This library runs the wheel build pipeline:
//! - installs a pyenv-managed interpreter and creates a disposable virtualenv
//! - builds a wheel and bundles its shared libraries (delocate / auditwheel)
//! - smoke-tests the installed wheel and stages it into an output directory
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
