//! Post-install smoke test.
//!
//! Installs the bundled wheel into the virtual environment and imports it
//! from an empty temporary directory. Python puts the working directory
//! first on `sys.path`, so running from the project tree could import the
//! local sources instead of the installed artifact.

use crate::bundler::{
    Result,
    error::ErrorExt,
    platform::libraries::{manifest_path, remove_stale_libraries},
    process::CommandRunner,
    python::{VirtualEnv, pip},
    settings::Settings,
};
use std::path::{Path, PathBuf};

/// What the smoke test did.
#[derive(Clone, Debug)]
pub struct SmokeOutcome {
    /// Library copies deleted before reinstalling.
    pub removed: Vec<PathBuf>,
    /// Directory the import ran in (already deleted).
    pub workdir: PathBuf,
    /// The Python statement that was executed.
    pub statement: String,
}

/// Installs `wheel` and imports the configured modules from a source-free directory.
pub async fn run<R: CommandRunner>(
    runner: &R,
    venv: &VirtualEnv,
    settings: &Settings,
    wheel: &Path,
) -> Result<SmokeOutcome> {
    // Leftover copies next to the sources cause duplicate-library errors on import
    let removed = remove_stale_libraries(
        settings.project_dir(),
        &manifest_path(settings.dist_dir()),
    )
    .await?;

    pip::install_wheel(runner, venv, wheel).await?;

    let workdir = tempfile::Builder::new()
        .prefix("wheel-smoke-")
        .tempdir()
        .fs_context("creating smoke test directory", std::env::temp_dir())?;
    ensure_source_free(workdir.path()).await?;

    let statement = settings.smoke_test().statement();
    log::info!("Smoke test in {}: {}", workdir.path().display(), statement);

    runner
        .run_checked(
            &venv
                .python_command()
                .arg("-c")
                .arg(&statement)
                .current_dir(workdir.path())
                .env_remove("PYTHONPATH"),
        )
        .await?;

    Ok(SmokeOutcome {
        removed,
        workdir: workdir.path().to_path_buf(),
        statement,
    })
}

/// Fails unless `dir` is empty.
async fn ensure_source_free(dir: &Path) -> Result<()> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .fs_context("reading smoke test directory", dir)?;
    if let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("reading smoke test directory", dir)?
    {
        crate::bail!(
            "smoke test directory {} is not empty (found {})",
            dir.display(),
            entry.path().display()
        );
    }
    Ok(())
}
