//! External tool detection.
//!
//! Programs are resolved against the `PATH` the child will actually see, so
//! tools installed into the virtual environment (`delocate-wheel`,
//! `auditwheel`) are found once the environment is active.

use crate::bundler::{Error, Result, process::Invocation};
use std::path::{Path, PathBuf};

/// Resolves the program of `invocation` to an executable path.
///
/// Programs given with a directory component are used as-is; bare names are
/// searched on the invocation's `PATH` override, falling back to the
/// parent's `PATH`.
pub fn locate_program(invocation: &Invocation) -> Result<PathBuf> {
    let program = Path::new(invocation.program());
    if program.components().count() > 1 {
        return Ok(program.to_path_buf());
    }

    let search_path = invocation
        .get_env("PATH")
        .map(|p| p.to_os_string())
        .or_else(|| std::env::var_os("PATH"));
    let cwd = match invocation.get_current_dir() {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };

    match which::which_in(program, search_path, &cwd) {
        Ok(path) => {
            log::debug!("Found {} at: {}", program.display(), path.display());
            Ok(path)
        }
        Err(e) => Err(Error::ToolNotFound {
            program: program.display().to_string(),
            reason: e.to_string(),
        }),
    }
}
