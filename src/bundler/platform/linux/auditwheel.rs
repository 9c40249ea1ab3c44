//! auditwheel-based bundling for Linux wheels.

use crate::bundler::{
    Result,
    process::CommandRunner,
    python::VirtualEnv,
    utils::fs,
    wheel::find_single_wheel,
};
use std::path::{Path, PathBuf};

/// Subdirectory of the dist directory that receives the repaired wheel.
const REPAIRED_DIR: &str = "repaired";

/// Repairs `wheel` with `auditwheel repair` and puts the result in its place.
///
/// The staged libraries in `library_dir` are made visible through
/// `LD_LIBRARY_PATH`. The repaired wheel usually carries a different platform
/// tag, so the original is deleted and the repaired one moved into the dist
/// directory; its new path is returned.
pub async fn bundle<R: CommandRunner>(
    runner: &R,
    venv: &VirtualEnv,
    wheel: &Path,
    library_dir: &Path,
) -> Result<PathBuf> {
    let dist_dir = wheel
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let repaired_dir = dist_dir.join(REPAIRED_DIR);
    fs::remove_dir_all(&repaired_dir).await?;

    let show = runner
        .run_checked(&venv.command("auditwheel").arg("show").arg(wheel))
        .await?;
    log::debug!("auditwheel show:\n{}", show.stdout.trim_end());

    let inherited = std::env::var_os("LD_LIBRARY_PATH").unwrap_or_default();
    let search = std::iter::once(library_dir.to_path_buf())
        .chain(std::env::split_paths(&inherited));
    let ld_library_path = std::env::join_paths(search).map_err(|e| {
        crate::bundler::Error::GenericError(format!(
            "Cannot add {} to LD_LIBRARY_PATH: {}",
            library_dir.display(),
            e
        ))
    })?;

    runner
        .run_checked(
            &venv
                .command("auditwheel")
                .arg("repair")
                .arg(wheel)
                .arg("-w")
                .arg(&repaired_dir)
                .env("LD_LIBRARY_PATH", ld_library_path),
        )
        .await?;

    let repaired = find_single_wheel(&repaired_dir)?;
    let file_name = repaired.file_name().ok_or_else(|| {
        crate::bundler::Error::GenericError(format!("Invalid wheel path: {}", repaired.display()))
    })?;
    let final_path = dist_dir.join(file_name);

    fs::remove_file(wheel).await?;
    fs::move_file(&repaired, &final_path).await?;
    fs::remove_dir_all(&repaired_dir).await?;

    log::info!("Repaired wheel: {}", final_path.display());
    Ok(final_path)
}
