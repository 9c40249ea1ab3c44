//! Locating built wheels.

use crate::bundler::{Error, Result, error::ErrorExt};
use std::path::{Path, PathBuf};

/// Lists every `*.whl` file directly inside `dir`, sorted.
///
/// A missing directory yields an empty list.
pub fn list_wheels(dir: &Path) -> Result<Vec<PathBuf>> {
    let dir_str = dir.to_str().ok_or_else(|| {
        Error::GenericError(format!(
            "Directory path contains invalid UTF-8: {}",
            dir.display()
        ))
    })?;
    let pattern = format!("{}/*.whl", glob::Pattern::escape(dir_str));

    let mut wheels = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry
            .map_err(std::io::Error::from)
            .fs_context("reading wheel directory", dir)?;
        if path.is_file() {
            wheels.push(path);
        }
    }
    wheels.sort();
    Ok(wheels)
}

/// Returns the only wheel in `dir`.
///
/// # Errors
///
/// [`Error::NoWheel`] when nothing matches and [`Error::AmbiguousWheels`]
/// when more than one wheel is present.
pub fn find_single_wheel(dir: &Path) -> Result<PathBuf> {
    let mut wheels = list_wheels(dir)?;
    match wheels.len() {
        0 => Err(Error::NoWheel {
            dir: dir.to_path_buf(),
        }),
        1 => Ok(wheels.remove(0)),
        _ => Err(Error::AmbiguousWheels {
            dir: dir.to_path_buf(),
            wheels,
        }),
    }
}
