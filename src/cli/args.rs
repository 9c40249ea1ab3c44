//! Command line argument parsing and validation.
//!
//! This module provides CLI argument parsing using clap, with validation
//! and conversion into pipeline [`Settings`].

use crate::bundler::{self, BuildBackend, PythonVersion, RepairTool, Settings, SettingsBuilder};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Builds, bundles, smoke-tests and stages a binary wheel
#[derive(Parser, Debug)]
#[command(
    name = "wheel_bundler",
    version,
    about = "Builds, bundles, smoke-tests and stages a binary wheel",
    long_about = "Builds a self-contained binary wheel for a native-extension project.

Installs the pyenv interpreter (skipped when present), creates a fresh virtualenv,
installs requirements, builds the wheel, bundles shared libraries with delocate
(macOS) or auditwheel (Linux), imports the installed wheel from an empty temp dir
and moves it into the output directory. The first failing step aborts the run.

Usage:
  PYENV_VERSION=3.9.1 wheel_bundler --native-lib '/usr/local/lib/libssh2*' --smoke-import ssh2.session
  wheel_bundler --python-version 3.8.10 -C ../parallel-ssh --smoke-import pssh.clients.native -o ../wheels

Exit code 0 = wheel staged in the output directory; otherwise the failing command's status."
)]
pub struct Args {
    /// Interpreter version to install and use
    #[arg(long, env = "PYENV_VERSION", value_name = "VERSION")]
    pub python_version: String,

    /// pyenv root (default: output of `pyenv root`)
    #[arg(long, env = "PYENV_ROOT", value_name = "DIR")]
    pub pyenv_root: Option<PathBuf>,

    /// Project source tree
    #[arg(short = 'C', long, value_name = "DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Dependency manifest, relative to the project directory
    #[arg(short = 'r', long, value_name = "FILE", default_value = "requirements.txt")]
    pub requirements: PathBuf,

    /// Shared libraries to bundle (glob, repeatable)
    #[arg(long = "native-lib", value_name = "GLOB")]
    pub native_libs: Vec<String>,

    /// Virtual environment directory, relative to the project directory
    #[arg(long, value_name = "DIR", default_value = "venv")]
    pub venv_dir: PathBuf,

    /// Wheel build directory, relative to the project directory
    #[arg(long, value_name = "DIR", default_value = "dist")]
    pub dist_dir: PathBuf,

    /// Existing directory the finished wheel is moved into
    ///
    /// The directory is never created; a missing directory fails the final step.
    #[arg(short = 'o', long, value_name = "DIR", default_value = "wheels")]
    pub output_dir: PathBuf,

    /// Shared-library bundling tool (default: delocate on macOS, auditwheel elsewhere)
    #[arg(long, value_enum, value_name = "TOOL")]
    pub repair_tool: Option<RepairTool>,

    /// How the wheel is built
    #[arg(long, value_enum, value_name = "BACKEND", default_value_t = BuildBackend::SetupPy)]
    pub build_backend: BuildBackend,

    /// Module imported by the smoke test (repeatable)
    #[arg(long = "smoke-import", value_name = "MODULE", required = true)]
    pub smoke_imports: Vec<String>,

    /// Kill any single command running longer than this many seconds
    ///
    /// On Unix the whole process group is killed, including compilers spawned
    /// by pip or setup.py. Elsewhere only the direct child is killed.
    #[arg(long, value_name = "SECS")]
    pub step_timeout: Option<u64>,

    /// Write a JSON run report to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Show subprocess output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.python_version.trim().is_empty() {
            return Err("Python version cannot be empty".to_string());
        }

        if self.step_timeout == Some(0) {
            return Err("--step-timeout must be at least 1 second".to_string());
        }

        if let Some(pattern) = self.native_libs.iter().find(|p| p.trim().is_empty()) {
            return Err(format!("Invalid --native-lib pattern: {:?}", pattern));
        }

        Ok(())
    }

    /// Converts the arguments into pipeline settings.
    pub fn to_settings(&self) -> bundler::Result<Settings> {
        let mut builder = SettingsBuilder::new()
            .python_version(PythonVersion::parse(&self.python_version)?)
            .project_dir(&self.project_dir)
            .requirements(&self.requirements)
            .native_libraries(self.native_libs.clone())
            .venv_dir(&self.venv_dir)
            .dist_dir(&self.dist_dir)
            .output_dir(&self.output_dir)
            .build_backend(self.build_backend);

        if let Some(root) = &self.pyenv_root {
            builder = builder.pyenv_root(root);
        }
        if let Some(tool) = self.repair_tool {
            builder = builder.repair_tool(tool);
        }
        if let Some(secs) = self.step_timeout {
            builder = builder.step_timeout(Duration::from_secs(secs));
        }
        for module in &self.smoke_imports {
            builder = builder.smoke_import(module);
        }

        builder.build()
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        let output = super::OutputManager::new(args.verbose, args.quiet);

        Self { output }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print success message if not in quiet mode
    pub fn success(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print warning message
    pub fn warn(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        let _ = self.output.error(message);
    }

    /// Print progress message
    pub fn progress(&self, message: &str) {
        let _ = self.output.progress(message);
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }
}
