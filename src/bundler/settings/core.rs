//! Core Settings struct and implementations.

use super::{BuildBackend, PythonVersion, RepairTool};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Modules imported by the smoke test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmokeTest {
    modules: Vec<String>,
}

impl SmokeTest {
    pub(super) fn new(modules: Vec<String>) -> Self {
        Self { modules }
    }

    /// Python statement passed to `python -c`.
    pub fn statement(&self) -> String {
        self.modules
            .iter()
            .map(|m| format!("import {m}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Main settings for a pipeline run.
///
/// Constructed via [`SettingsBuilder`](super::SettingsBuilder), which
/// validates the interpreter version and smoke-test modules and resolves
/// every relative path against the project directory.
///
/// # Examples
///
/// ```no_run
/// use wheel_bundler::bundler::{PythonVersion, SettingsBuilder};
///
/// # fn example() -> wheel_bundler::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .python_version(PythonVersion::parse("3.9.1")?)
///     .project_dir("/src/ssh2-python")
///     .native_library("/usr/local/lib/libssh2*")
///     .smoke_import("ssh2.session")
///     .build()?;
/// assert!(settings.output_dir().ends_with("wheels"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Settings {
    python_version: PythonVersion,

    /// `None` means "ask `pyenv root`".
    pyenv_root: Option<PathBuf>,

    project_dir: PathBuf,
    requirements: PathBuf,

    /// Glob patterns of system libraries copied next to the build before bundling.
    native_libraries: Vec<String>,

    venv_dir: PathBuf,
    dist_dir: PathBuf,

    /// Must exist before the run; never created.
    output_dir: PathBuf,

    repair_tool: RepairTool,
    build_backend: BuildBackend,
    smoke_test: SmokeTest,
    step_timeout: Option<Duration>,
}

impl Settings {
    /// Returns the interpreter version identifier.
    pub fn python_version(&self) -> &PythonVersion {
        &self.python_version
    }

    /// Returns the configured pyenv root, if any.
    pub fn pyenv_root(&self) -> Option<&Path> {
        self.pyenv_root.as_deref()
    }

    /// Returns the absolute project directory.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Returns the dependency manifest path.
    pub fn requirements(&self) -> &Path {
        &self.requirements
    }

    /// Returns the native library glob patterns.
    pub fn native_libraries(&self) -> &[String] {
        &self.native_libraries
    }

    /// Returns the virtual environment directory.
    pub fn venv_dir(&self) -> &Path {
        &self.venv_dir
    }

    /// Returns the directory the wheel is built into.
    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    /// Returns the staging directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns the repair tool.
    pub fn repair_tool(&self) -> RepairTool {
        self.repair_tool
    }

    /// Returns the build backend.
    pub fn build_backend(&self) -> BuildBackend {
        self.build_backend
    }

    /// Returns the smoke test definition.
    pub fn smoke_test(&self) -> &SmokeTest {
        &self.smoke_test
    }

    /// Returns the per-command timeout.
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        python_version: PythonVersion,
        pyenv_root: Option<PathBuf>,
        project_dir: PathBuf,
        requirements: PathBuf,
        native_libraries: Vec<String>,
        venv_dir: PathBuf,
        dist_dir: PathBuf,
        output_dir: PathBuf,
        repair_tool: RepairTool,
        build_backend: BuildBackend,
        smoke_test: SmokeTest,
        step_timeout: Option<Duration>,
    ) -> Self {
        Self {
            python_version,
            pyenv_root,
            project_dir,
            requirements,
            native_libraries,
            venv_dir,
            dist_dir,
            output_dir,
            repair_tool,
            build_backend,
            smoke_test,
            step_timeout,
        }
    }
}
