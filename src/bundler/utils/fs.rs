//! File system utilities for the pipeline.
//!
//! Idempotent removals and a `mv -f` equivalent that works across
//! filesystems.

use crate::bundler::error::{ErrorExt, Result};
use std::{io, path::Path};
use tokio::fs;

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}

/// Removes a file if it exists.
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing file", path),
    }
}

/// Copies a regular file from one path to another.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(crate::bundler::error::Error::GenericError(format!(
            "{from:?} does not exist"
        )));
    }
    if !from.is_file() {
        return Err(crate::bundler::error::Error::GenericError(format!(
            "{from:?} is not a file"
        )));
    }
    fs::copy(from, to).await.fs_context("copying file", from)?;
    Ok(())
}

/// Moves a file, replacing an existing destination.
///
/// Falls back to copy + delete when source and destination live on
/// different filesystems.
pub async fn move_file(from: &Path, to: &Path) -> Result<()> {
    // rename() refuses to replace an existing file on Windows
    #[cfg(windows)]
    remove_file(to).await?;

    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            log::debug!(
                "{} and {} are on different devices, copying",
                from.display(),
                to.display()
            );
            copy_file(from, to).await?;
            fs::remove_file(from)
                .await
                .fs_context("removing moved file", from)
        }
        Err(e) => Err(e).fs_context("moving file", from),
    }
}
