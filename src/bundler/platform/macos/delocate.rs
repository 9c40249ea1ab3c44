//! delocate-based bundling for macOS wheels.
//!
//! `delocate-wheel` copies every non-system dylib the extension links into
//! `<package>/.dylibs/` and rewrites install names to `@loader_path`, so the
//! wheel no longer depends on `/usr/local` or Homebrew prefixes.

use crate::bundler::{
    Error, Result,
    platform::libraries::external_dependencies,
    process::CommandRunner,
    python::VirtualEnv,
};
use std::path::{Path, PathBuf};

/// Runs `delocate-listdeps` on the wheel and returns its stdout.
pub async fn list_dependencies<R: CommandRunner>(
    runner: &R,
    venv: &VirtualEnv,
    wheel: &Path,
    project_dir: &Path,
) -> Result<String> {
    let output = runner
        .run_checked(
            &venv
                .command("delocate-listdeps")
                .arg(wheel)
                .current_dir(project_dir),
        )
        .await?;
    Ok(output.stdout)
}

/// Delocates `wheel` in place.
///
/// Dependencies are listed before and after; any absolute, non-system
/// library still listed afterwards fails the step. A wheel that fails
/// half-way is left as it is.
pub async fn bundle<R: CommandRunner>(
    runner: &R,
    venv: &VirtualEnv,
    wheel: &Path,
    project_dir: &Path,
) -> Result<PathBuf> {
    let before = list_dependencies(runner, venv, wheel, project_dir).await?;
    let external = external_dependencies(&before);
    log::info!(
        "{} links {} external librar{} before delocating",
        wheel.display(),
        external.len(),
        if external.len() == 1 { "y" } else { "ies" }
    );
    for lib in &external {
        log::debug!("  - {}", lib);
    }

    runner
        .run_checked(
            &venv
                .command("delocate-wheel")
                .arg("-v")
                .arg(wheel)
                .current_dir(project_dir),
        )
        .await?;

    let after = list_dependencies(runner, venv, wheel, project_dir).await?;
    let remaining = external_dependencies(&after);
    if !remaining.is_empty() {
        return Err(Error::UnbundledLibraries {
            wheel: wheel.to_path_buf(),
            libraries: remaining,
        });
    }

    Ok(wheel.to_path_buf())
}
