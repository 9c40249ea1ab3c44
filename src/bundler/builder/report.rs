//! Run report.
//!
//! Records what each pipeline step did so a failed run can be diagnosed and
//! a successful one audited. Serialized as JSON with `--report`.

use crate::bundler::{Result, error::ErrorExt, settings::{PythonVersion, RepairTool}};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The pipeline steps, in execution order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    /// pyenv interpreter installation.
    InstallToolchain,
    /// Virtual environment creation.
    CreateEnvironment,
    /// Packaging tools and manifest dependencies.
    InstallDependencies,
    /// Wheel build.
    BuildWheel,
    /// Shared-library bundling.
    BundleNativeLibraries,
    /// Install and import from a neutral directory.
    SmokeTest,
    /// Move into the output directory.
    Stage,
}

impl Step {
    /// All steps in order.
    pub const ALL: [Step; 7] = [
        Step::InstallToolchain,
        Step::CreateEnvironment,
        Step::InstallDependencies,
        Step::BuildWheel,
        Step::BundleNativeLibraries,
        Step::SmokeTest,
        Step::Stage,
    ];
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::InstallToolchain => "install toolchain",
            Step::CreateEnvironment => "create environment",
            Step::InstallDependencies => "install dependencies",
            Step::BuildWheel => "build wheel",
            Step::BundleNativeLibraries => "bundle native libraries",
            Step::SmokeTest => "smoke test",
            Step::Stage => "stage",
        };
        f.write_str(name)
    }
}

/// How a step ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Ran and succeeded.
    Completed,
    /// Nothing to do (e.g. interpreter already installed).
    Skipped,
    /// Ran and failed; the pipeline stopped here.
    Failed,
}

/// One executed step.
#[derive(Clone, Debug, Serialize)]
pub struct StepRecord {
    /// Which step.
    pub step: Step,
    /// How it ended.
    pub status: StepStatus,
    /// Wall-clock time spent.
    pub duration_ms: u64,
    /// Human-readable summary or error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The wheel as staged in the output directory.
#[derive(Clone, Debug, Serialize)]
pub struct StagedArtifact {
    /// Final location.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Hex-encoded SHA-256.
    pub sha256: String,
    /// Library file names embedded in the wheel.
    pub bundled_libraries: Vec<String>,
}

/// Report of a pipeline run.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineReport {
    /// Interpreter version used.
    pub python_version: PythonVersion,
    /// Repair tool used.
    pub repair_tool: RepairTool,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended, successfully or not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Executed steps in order; steps after a failure are absent.
    pub steps: Vec<StepRecord>,
    /// The staged wheel, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<StagedArtifact>,
}

impl PipelineReport {
    /// Starts a report for a run beginning now.
    pub fn new(python_version: PythonVersion, repair_tool: RepairTool) -> Self {
        Self {
            python_version,
            repair_tool,
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
            artifact: None,
        }
    }

    /// Appends a step record.
    pub fn record(
        &mut self,
        step: Step,
        status: StepStatus,
        duration: Duration,
        detail: Option<String>,
    ) {
        self.steps.push(StepRecord {
            step,
            status,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            detail,
        });
    }

    /// Marks the run as finished.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Record of `step`, if it ran.
    pub fn step(&self, step: Step) -> Option<&StepRecord> {
        self.steps.iter().find(|r| r.step == step)
    }

    /// The step that failed, if any.
    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|r| r.status == StepStatus::Failed)
    }

    /// Whether every step ran without failure.
    pub fn succeeded(&self) -> bool {
        self.failed_step().is_none() && self.steps.len() == Step::ALL.len()
    }

    /// Writes the report as pretty-printed JSON.
    pub async fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| crate::bundler::Error::GenericError(format!("serializing report: {}", e)))?;
        tokio::fs::write(path, json)
            .await
            .fs_context("writing report", path)
    }
}

/// Outcome of [`Bundler::run`](super::Bundler::run).
///
/// The report is produced even when the run fails.
#[derive(Debug)]
pub struct RunOutcome {
    /// Step-by-step record.
    pub report: PipelineReport,
    /// The staged artifact, or the error that stopped the run.
    pub result: Result<StagedArtifact>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_step_names_in_kebab_case() {
        let mut report = PipelineReport::new(
            PythonVersion::parse("3.9.1").unwrap(),
            RepairTool::Delocate,
        );
        report.record(
            Step::InstallToolchain,
            StepStatus::Skipped,
            Duration::from_millis(3),
            None,
        );
        report.record(
            Step::CreateEnvironment,
            StepStatus::Failed,
            Duration::from_millis(40),
            Some("boom".into()),
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["python_version"], "3.9.1");
        assert_eq!(json["repair_tool"], "delocate");
        assert_eq!(json["steps"][0]["step"], "install-toolchain");
        assert_eq!(json["steps"][0]["status"], "skipped");
        assert!(json["steps"][0].get("detail").is_none());
        assert_eq!(json["steps"][1]["detail"], "boom");
        assert!(!report.succeeded());
        assert_eq!(report.failed_step().unwrap().step, Step::CreateEnvironment);
    }
}
