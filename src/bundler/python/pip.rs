//! pip-driven installs into the virtual environment.

use super::VirtualEnv;
use crate::bundler::{
    Error, Result,
    process::CommandRunner,
    settings::RepairTool,
};
use std::path::Path;

/// Upgrades the packaging tools and installs the repair tool.
pub async fn upgrade_build_tools<R: CommandRunner>(
    runner: &R,
    venv: &VirtualEnv,
    repair_tool: RepairTool,
) -> Result<()> {
    log::info!("Upgrading pip, setuptools, wheel and {}", repair_tool);
    runner
        .run_checked(&venv.python_command().args([
            "-m",
            "pip",
            "install",
            "-U",
            "pip",
            "setuptools",
            "wheel",
            repair_tool.package(),
        ]))
        .await?;
    Ok(())
}

/// Installs the project dependencies listed in `manifest`.
pub async fn install_requirements<R: CommandRunner>(
    runner: &R,
    venv: &VirtualEnv,
    manifest: &Path,
    project_dir: &Path,
) -> Result<()> {
    if !manifest.is_file() {
        return Err(Error::ManifestMissing(manifest.to_path_buf()));
    }

    log::info!("Installing dependencies from {}", manifest.display());
    runner
        .run_checked(
            &venv
                .python_command()
                .args(["-m", "pip", "install", "-r"])
                .arg(manifest)
                .current_dir(project_dir),
        )
        .await?;
    Ok(())
}

/// Installs a built wheel into the environment.
pub async fn install_wheel<R: CommandRunner>(
    runner: &R,
    venv: &VirtualEnv,
    wheel: &Path,
) -> Result<()> {
    log::info!("Installing {}", wheel.display());
    runner
        .run_checked(
            &venv
                .python_command()
                .args(["-m", "pip", "install", "-v"])
                .arg(wheel),
        )
        .await?;
    Ok(())
}
