//! pyenv-managed interpreter installation.

use crate::bundler::{
    Error, Result,
    process::{CommandRunner, Invocation},
    settings::{PythonVersion, Settings},
};
use std::path::PathBuf;

/// A pyenv interpreter version inside a pyenv root.
#[derive(Clone, Debug)]
pub struct Toolchain {
    root: PathBuf,
    version: PythonVersion,
}

impl Toolchain {
    /// Describes `version` under the pyenv `root`.
    pub fn new(root: impl Into<PathBuf>, version: PythonVersion) -> Self {
        Self {
            root: root.into(),
            version,
        }
    }

    /// The selected version.
    pub fn version(&self) -> &PythonVersion {
        &self.version
    }

    /// `<root>/versions/<version>`
    pub fn version_dir(&self) -> PathBuf {
        self.root.join("versions").join(self.version.as_str())
    }

    /// The interpreter binary of this version.
    pub fn interpreter(&self) -> PathBuf {
        self.version_dir().join("bin").join("python")
    }

    /// Whether pyenv already manages this version.
    pub fn is_installed(&self) -> bool {
        self.version_dir().is_dir()
    }

    /// A `pyenv` invocation with this root and version exported.
    fn pyenv(&self) -> Invocation {
        Invocation::new("pyenv")
            .env("PYENV_ROOT", &self.root)
            .env("PYENV_VERSION", self.version.as_str())
    }
}

/// Resolves the pyenv root from settings, or by asking `pyenv root`.
pub async fn resolve_root<R: CommandRunner>(runner: &R, settings: &Settings) -> Result<PathBuf> {
    if let Some(root) = settings.pyenv_root() {
        return Ok(root.to_path_buf());
    }

    let output = runner
        .run_checked(
            &Invocation::new("pyenv")
                .arg("root")
                .env("PYENV_VERSION", settings.python_version().as_str()),
        )
        .await?;

    let root = output.stdout.trim();
    if root.is_empty() {
        return Err(Error::GenericError(
            "`pyenv root` printed nothing".to_string(),
        ));
    }
    Ok(PathBuf::from(root))
}

/// Ensures the configured interpreter version is installed.
///
/// Installation is skipped when `<root>/versions/<version>` already exists.
///
/// # Returns
///
/// The toolchain and whether an installation actually ran.
pub async fn ensure_installed<R: CommandRunner>(
    runner: &R,
    settings: &Settings,
) -> Result<(Toolchain, bool)> {
    let root = resolve_root(runner, settings).await?;
    let toolchain = Toolchain::new(root, settings.python_version().clone());

    if toolchain.is_installed() {
        log::info!(
            "Python {} already installed at {}",
            toolchain.version(),
            toolchain.version_dir().display()
        );
        return Ok((toolchain, false));
    }

    log::info!("Installing Python {} with pyenv", toolchain.version());
    runner
        .run_checked(
            &toolchain
                .pyenv()
                .arg("install")
                .arg(toolchain.version().as_str()),
        )
        .await?;

    let interpreter = toolchain.interpreter();
    if !interpreter.exists() {
        return Err(Error::InterpreterMissing(interpreter));
    }

    Ok((toolchain, true))
}
