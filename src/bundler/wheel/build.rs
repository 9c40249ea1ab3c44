//! Building the project into a binary wheel.

use super::discover::{find_single_wheel, list_wheels};
use crate::bundler::{
    Result,
    error::ErrorExt,
    process::CommandRunner,
    python::VirtualEnv,
    settings::{BuildBackend, Settings},
};
use std::path::{Path, PathBuf};

/// Removes wheels left in `dist_dir` by earlier runs.
///
/// Only `*.whl` files are touched; source distributions and other files stay.
pub async fn clear_stale_wheels(dist_dir: &Path) -> Result<Vec<PathBuf>> {
    let stale = list_wheels(dist_dir)?;
    for wheel in &stale {
        log::debug!("Removing stale wheel {}", wheel.display());
        tokio::fs::remove_file(wheel)
            .await
            .fs_context("removing stale wheel", wheel)?;
    }
    Ok(stale)
}

/// Builds the project wheel into the dist directory and returns its path.
///
/// Exactly one wheel must exist afterwards.
pub async fn build_wheel<R: CommandRunner>(
    runner: &R,
    venv: &VirtualEnv,
    settings: &Settings,
) -> Result<PathBuf> {
    let stale = clear_stale_wheels(settings.dist_dir()).await?;
    if !stale.is_empty() {
        log::info!("Removed {} stale wheel(s) from {}", stale.len(), settings.dist_dir().display());
    }

    let invocation = match settings.build_backend() {
        BuildBackend::SetupPy => venv
            .python_command()
            .args(["setup.py", "bdist_wheel", "-d"])
            .arg(settings.dist_dir()),
        BuildBackend::Pip => venv
            .python_command()
            .args(["-m", "pip", "wheel", "--no-deps", "-w"])
            .arg(settings.dist_dir())
            .arg(settings.project_dir()),
    }
    .current_dir(settings.project_dir());

    log::info!("Building wheel with {:?} backend", settings.build_backend());
    runner.run_checked(&invocation).await?;

    find_single_wheel(settings.dist_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stale_wheels_are_removed_and_other_files_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old-0.1-py3-none-any.whl"), b"").unwrap();
        std::fs::write(dir.path().join("old-0.1.tar.gz"), b"").unwrap();

        let removed = clear_stale_wheels(dir.path()).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert!(dir.path().join("old-0.1.tar.gz").exists());
        assert!(list_wheels(dir.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_dist_dir_has_nothing_stale() {
        let dir = tempfile::tempdir().unwrap();
        let removed = clear_stale_wheels(&dir.path().join("dist")).await.unwrap();
        assert!(removed.is_empty());
    }
}
