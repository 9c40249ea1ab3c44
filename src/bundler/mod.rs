//! Wheel build pipeline.
//!
//! Turns a native-extension project into a self-contained binary wheel:
//!
//! 1. [`python::pyenv`] installs and selects the interpreter
//! 2. [`python::venv`] creates a disposable virtual environment
//! 3. [`python::pip`] installs packaging tools and project dependencies
//! 4. [`wheel`] builds the wheel and enforces that exactly one exists
//! 5. [`platform`] embeds shared libraries with delocate or auditwheel
//! 6. [`smoke`] installs the wheel and imports it outside the source tree
//! 7. [`stage`] moves the wheel into the output directory
//!
//! [`Bundler`] runs the steps in order with fail-fast semantics; every
//! subprocess goes through a [`CommandRunner`].

mod builder;
pub mod error;
pub mod platform;
pub mod process;
pub mod python;
pub mod settings;
pub mod smoke;
pub mod stage;
pub mod utils;
pub mod wheel;

pub use builder::{
    Bundler, PipelineReport, RunOutcome, StagedArtifact, Step, StepRecord, StepStatus,
    calculate_sha256,
};
pub use error::{Error, Result};
pub use process::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
pub use settings::{BuildBackend, PythonVersion, RepairTool, Settings, SettingsBuilder, SmokeTest};
