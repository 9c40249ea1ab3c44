//! Reading wheel archives.

use crate::bundler::{Error, Result, error::ErrorExt};
use std::path::{Path, PathBuf};

/// Lists the shared libraries embedded in a wheel by a repair tool.
///
/// Embedded libraries live under a directory whose name ends with
/// `library_dir_suffix` (`pkg/.dylibs/` for delocate, `pkg.libs/` for
/// auditwheel). Returns their file names, sorted.
pub async fn bundled_libraries(wheel: &Path, library_dir_suffix: &str) -> Result<Vec<String>> {
    let wheel: PathBuf = wheel.to_path_buf();
    let suffix = library_dir_suffix.to_string();

    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&wheel).fs_context("opening wheel", &wheel)?;
        let archive = zip::ZipArchive::new(file)?;

        let mut libraries: Vec<String> = archive
            .file_names()
            .filter_map(|name| embedded_library_name(name, &suffix))
            .map(str::to_string)
            .collect();
        libraries.sort();
        libraries.dedup();
        Ok::<_, Error>(libraries)
    })
    .await
    .map_err(|e| Error::GenericError(format!("Wheel inspection task panicked: {}", e)))?
}

/// File name of an archive entry when it sits directly in a library directory.
fn embedded_library_name<'a>(entry: &'a str, suffix: &str) -> Option<&'a str> {
    let (dir, file) = entry.rsplit_once('/')?;
    let parent = dir.rsplit('/').next()?;
    if file.is_empty() || !parent.ends_with(suffix) {
        return None;
    }
    Some(file)
}
