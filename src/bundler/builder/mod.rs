//! Pipeline orchestration and coordination.
//!
//! - [`checksum`] - SHA256 checksum calculation for the staged wheel
//! - [`orchestrator`] - Main [`Bundler`] struct running the steps
//! - [`report`] - Per-step run report
//! - [`tool_detection`] - External tool lookup

mod checksum;
mod orchestrator;
pub(crate) mod report;
pub(crate) mod tool_detection;

pub use checksum::calculate_sha256;
pub use orchestrator::Bundler;
pub use report::{PipelineReport, RunOutcome, StagedArtifact, Step, StepRecord, StepStatus};
