//! Builder for constructing Settings.

use super::{BuildBackend, PythonVersion, RepairTool, Settings, SmokeTest};
use crate::bundler::error::{Context, ErrorExt};
use crate::bundler::{Error, Result};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_REQUIREMENTS: &str = "requirements.txt";
const DEFAULT_VENV_DIR: &str = "venv";
const DEFAULT_DIST_DIR: &str = "dist";
const DEFAULT_OUTPUT_DIR: &str = "wheels";

/// Builder for constructing [`Settings`].
///
/// Only the interpreter version and at least one smoke-test import are
/// required; everything else has a default relative to the project
/// directory.
#[derive(Default)]
pub struct SettingsBuilder {
    python_version: Option<PythonVersion>,
    pyenv_root: Option<PathBuf>,
    project_dir: Option<PathBuf>,
    requirements: Option<PathBuf>,
    native_libraries: Vec<String>,
    venv_dir: Option<PathBuf>,
    dist_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    repair_tool: Option<RepairTool>,
    build_backend: BuildBackend,
    smoke_modules: Vec<String>,
    step_timeout: Option<Duration>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the interpreter version.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn python_version(mut self, version: PythonVersion) -> Self {
        self.python_version = Some(version);
        self
    }

    /// Sets the pyenv root. When unset, `pyenv root` is queried at run time.
    pub fn pyenv_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.pyenv_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the project directory.
    ///
    /// Default: the current working directory
    pub fn project_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.project_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the dependency manifest.
    ///
    /// Default: `requirements.txt`
    pub fn requirements<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.requirements = Some(path.as_ref().to_path_buf());
        self
    }

    /// Adds a glob pattern of shared libraries to bundle.
    pub fn native_library(mut self, pattern: impl Into<String>) -> Self {
        self.native_libraries.push(pattern.into());
        self
    }

    /// Replaces the native library patterns.
    pub fn native_libraries(mut self, patterns: Vec<String>) -> Self {
        self.native_libraries = patterns;
        self
    }

    /// Sets the virtual environment directory.
    ///
    /// Default: `venv`
    pub fn venv_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.venv_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the directory the wheel is built into.
    ///
    /// Default: `dist`
    pub fn dist_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.dist_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the staging directory.
    ///
    /// Default: `wheels`
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the repair tool.
    ///
    /// Default: [`RepairTool::platform_default`]
    pub fn repair_tool(mut self, tool: RepairTool) -> Self {
        self.repair_tool = Some(tool);
        self
    }

    /// Sets the build backend.
    pub fn build_backend(mut self, backend: BuildBackend) -> Self {
        self.build_backend = backend;
        self
    }

    /// Adds a module imported by the smoke test.
    pub fn smoke_import(mut self, module: impl Into<String>) -> Self {
        self.smoke_modules.push(module.into());
        self
    }

    /// Sets the per-command timeout.
    ///
    /// Default: None (commands may run indefinitely)
    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the interpreter version is missing, no smoke-test
    /// module is given, a module name is not a dotted Python identifier, or
    /// a path cannot be made absolute.
    pub fn build(self) -> Result<Settings> {
        let python_version = self
            .python_version
            .context("python_version is required")?;

        if self.smoke_modules.is_empty() {
            return Err(Error::GenericError(
                "at least one smoke-test import is required".into(),
            ));
        }
        for module in &self.smoke_modules {
            validate_module_name(module)?;
        }

        let project_dir = match self.project_dir {
            Some(dir) => dir,
            None => std::env::current_dir().fs_context("reading current directory", ".")?,
        };
        let project_dir = project_dir
            .absolutize()
            .fs_context("resolving project directory", &project_dir)?
            .into_owned();

        let resolve = |path: Option<PathBuf>, default: &str| -> Result<PathBuf> {
            let path = path.unwrap_or_else(|| PathBuf::from(default));
            Ok(path
                .absolutize_from(&project_dir)
                .fs_context("resolving path", &path)?
                .into_owned())
        };

        let requirements = resolve(self.requirements, DEFAULT_REQUIREMENTS)?;
        let venv_dir = resolve(self.venv_dir, DEFAULT_VENV_DIR)?;
        let dist_dir = resolve(self.dist_dir, DEFAULT_DIST_DIR)?;
        let output_dir = resolve(self.output_dir, DEFAULT_OUTPUT_DIR)?;

        Ok(Settings::new(
            python_version,
            self.pyenv_root,
            project_dir,
            requirements,
            self.native_libraries,
            venv_dir,
            dist_dir,
            output_dir,
            self.repair_tool.unwrap_or_default(),
            self.build_backend,
            SmokeTest::new(self.smoke_modules),
            self.step_timeout,
        ))
    }
}

/// Accepts dotted identifiers like `pssh.clients.native`.
fn validate_module_name(module: &str) -> Result<()> {
    let valid = !module.is_empty()
        && module.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic())
                && chars.all(|c| c == '_' || c.is_alphanumeric())
        });

    if valid {
        Ok(())
    } else {
        Err(Error::GenericError(format!(
            "invalid smoke-test module name `{module}`"
        )))
    }
}
