//! Native dependency bundling.
//!
//! Stages the configured system libraries next to the build, runs the repair
//! tool for the selected platform and reports which libraries ended up
//! inside the wheel.

pub mod libraries;
pub mod linux;
pub mod macos;

use crate::bundler::{
    Result, process::CommandRunner, python::VirtualEnv, settings::RepairTool,
    settings::Settings, wheel::bundled_libraries,
};
use libraries::{library_stem, manifest_path, remove_stale_libraries, stage_libraries};
use std::path::PathBuf;

/// Result of the bundling step.
#[derive(Clone, Debug)]
pub struct BundleOutcome {
    /// The self-contained wheel. Differs from the input for auditwheel.
    pub wheel: PathBuf,
    /// Library copies left next to the build.
    pub staged: Vec<PathBuf>,
    /// Library file names embedded in the wheel.
    pub bundled: Vec<String>,
}

/// Bundles the wheel's shared-library dependencies into it.
///
/// # Process
///
/// 1. Deletes library copies an earlier run recorded in the staging manifest
/// 2. Copies the configured libraries into the project directory, recording
///    them in the manifest
/// 3. Runs delocate or auditwheel
/// 4. Lists the libraries embedded in the result
pub async fn bundle_native_libraries<R: CommandRunner>(
    runner: &R,
    venv: &VirtualEnv,
    settings: &Settings,
    wheel: PathBuf,
) -> Result<BundleOutcome> {
    let project_dir = settings.project_dir();
    let patterns = settings.native_libraries();

    let manifest = manifest_path(settings.dist_dir());

    let stale = remove_stale_libraries(project_dir, &manifest).await?;
    if !stale.is_empty() {
        log::info!("Removed {} stale library copies", stale.len());
    }

    let staged = stage_libraries(patterns, project_dir, &manifest).await?;
    log::info!(
        "Staged {} native librar{} in {}",
        staged.len(),
        if staged.len() == 1 { "y" } else { "ies" },
        project_dir.display()
    );

    let wheel = match settings.repair_tool() {
        RepairTool::Delocate => macos::delocate::bundle(runner, venv, &wheel, project_dir).await?,
        RepairTool::Auditwheel => {
            linux::auditwheel::bundle(runner, venv, &wheel, project_dir).await?
        }
    };

    let bundled =
        bundled_libraries(&wheel, settings.repair_tool().library_dir_suffix()).await?;
    for lib in staged.iter().filter(|lib| lib.shared) {
        let name = lib.staged.file_name().unwrap_or_default().to_string_lossy();
        let stem = library_stem(&name);
        if !bundled.iter().any(|b| library_stem(b) == stem) {
            log::warn!(
                "{} was staged but is not embedded in {}; the extension may not link it",
                name,
                wheel.display()
            );
        }
    }

    Ok(BundleOutcome {
        wheel,
        staged: staged.into_iter().map(|lib| lib.staged).collect(),
        bundled,
    })
}
