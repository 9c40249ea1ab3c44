//! Disposable virtual environments.

use super::Toolchain;
use crate::bundler::{
    Error, Result,
    process::{CommandRunner, Invocation},
    settings::PythonVersion,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// An "activated" virtual environment.
///
/// Activation is expressed per command: invocations built through
/// [`VirtualEnv::command`] see the environment's `bin` first on `PATH`,
/// `VIRTUAL_ENV` set, `PYTHONHOME` cleared and `PYENV_VERSION` exported.
#[derive(Clone, Debug)]
pub struct VirtualEnv {
    root: PathBuf,
    version: PythonVersion,
}

impl VirtualEnv {
    /// Wraps an existing environment directory.
    pub fn new(root: impl Into<PathBuf>, version: PythonVersion) -> Self {
        Self {
            root: root.into(),
            version,
        }
    }

    /// Environment root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the environment's executables.
    pub fn bin_dir(&self) -> PathBuf {
        if cfg!(windows) {
            self.root.join("Scripts")
        } else {
            self.root.join("bin")
        }
    }

    /// The environment's interpreter.
    pub fn python(&self) -> PathBuf {
        self.bin_dir().join("python")
    }

    /// An invocation of `program` inside the environment.
    pub fn command(&self, program: impl AsRef<OsStr>) -> Invocation {
        let mut invocation = Invocation::new(program)
            .env("VIRTUAL_ENV", &self.root)
            .env("PYENV_VERSION", self.version.as_str())
            .env_remove("PYTHONHOME");

        let inherited = std::env::var_os("PATH").unwrap_or_default();
        let paths =
            std::iter::once(self.bin_dir()).chain(std::env::split_paths(&inherited));
        match std::env::join_paths(paths) {
            Ok(path) => invocation = invocation.env("PATH", path),
            Err(e) => log::warn!("Cannot prepend {} to PATH: {}", self.bin_dir().display(), e),
        }
        invocation
    }

    /// An invocation of the environment's interpreter.
    pub fn python_command(&self) -> Invocation {
        self.command(self.python())
    }
}

/// Creates a fresh environment at `venv_dir` from the toolchain interpreter.
///
/// `--clear` empties any previous environment at the same path.
pub async fn create<R: CommandRunner>(
    runner: &R,
    toolchain: &Toolchain,
    venv_dir: &Path,
    project_dir: &Path,
) -> Result<VirtualEnv> {
    log::info!("Creating virtual environment at {}", venv_dir.display());

    runner
        .run_checked(
            &Invocation::new(toolchain.interpreter())
                .args(["-m", "venv", "--clear"])
                .arg(venv_dir)
                .current_dir(project_dir)
                .env("PYENV_VERSION", toolchain.version().as_str()),
        )
        .await?;

    let venv = VirtualEnv::new(venv_dir, toolchain.version().clone());
    if !venv.python().exists() {
        return Err(Error::InterpreterMissing(venv.python()));
    }
    Ok(venv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn commands_run_inside_the_environment() {
        let venv = VirtualEnv::new("/p/venv", PythonVersion::parse("3.9.1").unwrap());
        let inv = venv.command("delocate-wheel");

        assert_eq!(inv.get_env("VIRTUAL_ENV"), Some(OsStr::new("/p/venv")));
        assert_eq!(inv.get_env("PYENV_VERSION"), Some(OsStr::new("3.9.1")));
        assert!(inv.removes_env("PYTHONHOME"));
        let path = inv.get_env("PATH").unwrap().to_string_lossy().into_owned();
        assert!(path.starts_with("/p/venv/bin"));
    }

    #[cfg(unix)]
    #[test]
    fn python_command_uses_venv_interpreter() {
        let venv = VirtualEnv::new("/p/venv", PythonVersion::parse("3.9.1").unwrap());
        assert_eq!(
            venv.python_command().program(),
            OsStr::new("/p/venv/bin/python")
        );
    }
}
