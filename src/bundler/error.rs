//! Error types for pipeline steps.

use std::{
    fmt::Display,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error as DeriveError;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building, bundling, testing or staging a wheel.
///
/// Every variant is fatal: the pipeline stops at the step that produced it.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Free-form failure.
    #[error("{0}")]
    GenericError(String),

    /// Bare I/O failure.
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// I/O failure on a known path.
    #[error("{context} {}: {error}", .path.display())]
    Fs {
        /// What was being attempted.
        context: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        error: io::Error,
    },

    /// External tool is not on the search path.
    #[error("`{program}` not found: {reason}")]
    ToolNotFound {
        /// Program name as invoked.
        program: String,
        /// Reason reported by the lookup.
        reason: String,
    },

    /// A subprocess exited unsuccessfully.
    #[error("{}", command_failed_message(.command, .code, .stderr))]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },

    /// A subprocess exceeded the step timeout and was killed.
    #[error("`{command}` timed out after {seconds}s")]
    CommandTimedOut {
        /// Rendered command line.
        command: String,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// The interpreter version identifier cannot name a pyenv version.
    #[error("invalid python version `{version}`: {reason}")]
    InvalidPythonVersion {
        /// Offending identifier.
        version: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The managed interpreter is missing after installation.
    #[error("interpreter not found at {}", .0.display())]
    InterpreterMissing(PathBuf),

    /// The dependency manifest does not exist.
    #[error("dependency manifest not found: {}", .0.display())]
    ManifestMissing(PathBuf),

    /// No wheel was produced.
    #[error("no wheel found in {}", .dir.display())]
    NoWheel {
        /// Directory searched.
        dir: PathBuf,
    },

    /// More than one wheel matched where exactly one is required.
    #[error("expected exactly one wheel in {}, found {}", .dir.display(), display_paths(.wheels))]
    AmbiguousWheels {
        /// Directory searched.
        dir: PathBuf,
        /// Every match.
        wheels: Vec<PathBuf>,
    },

    /// A native library pattern matched nothing.
    #[error("native library pattern `{pattern}` matched no files")]
    NativeLibraryNotFound {
        /// Glob pattern as configured.
        pattern: String,
    },

    /// The wheel still depends on libraries outside of it after bundling.
    #[error("{} still depends on external libraries: {}", .wheel.display(), .libraries.join(", "))]
    UnbundledLibraries {
        /// Wheel checked.
        wheel: PathBuf,
        /// External library paths reported.
        libraries: Vec<String>,
    },

    /// Staging a library would overwrite a file already in the project.
    #[error(
        "refusing to stage {} over existing {}",
        .library.display(),
        .existing.display()
    )]
    StagingConflict {
        /// Library matched by a `--native-lib` pattern.
        library: PathBuf,
        /// File of the same name already next to the build.
        existing: PathBuf,
    },

    /// The staging directory does not exist.
    #[error("output directory does not exist: {}", .0.display())]
    OutputDirMissing(PathBuf),

    /// Invalid glob pattern.
    #[error(transparent)]
    Glob(#[from] glob::PatternError),

    /// Wheel archive could not be read.
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl Error {
    /// Process exit code for this error.
    ///
    /// Mirrors shell fail-fast semantics: a failed subprocess propagates its
    /// own status, anything else exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CommandFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn command_failed_message(command: &str, code: &Option<i32>, stderr: &str) -> String {
    let status = match code {
        Some(code) => format!("exit code {code}"),
        None => "signal".to_string(),
    };
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        format!("`{command}` failed with {status}")
    } else {
        format!("`{command}` failed with {status}:\n{stderr}")
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    let listed: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    format!("{}: {}", paths.len(), listed.join(", "))
}

/// Attaches filesystem context to I/O results.
pub trait ErrorExt<T> {
    /// Wraps an I/O error with what was being done and on which path.
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.as_ref().to_path_buf(),
            error,
        })
    }
}

/// Converts missing values into [`Error::GenericError`].
pub trait Context<T> {
    /// Returns the contained value or an error carrying `context`.
    fn context<C: Display>(self, context: C) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }
}

/// Returns early with a [`Error::GenericError`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)))
    };
}
