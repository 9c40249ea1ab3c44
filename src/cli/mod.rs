//! Command line interface for the wheel bundler.
//!
//! Parses arguments, runs the pipeline with real subprocesses, writes the
//! optional report and prints a per-step summary.

mod args;
mod output;

pub use args::{Args, RuntimeConfig};
pub use output::OutputManager;

use crate::bundler::{Bundler, PipelineReport, ProcessRunner, StepStatus};
use crate::error::{CliError, Result};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(&args).await
}

/// Runs the pipeline described by already-parsed arguments.
///
/// Returns exit code 0 on success; pipeline failures are returned as errors
/// carrying the failing command's status.
pub async fn execute(args: &Args) -> Result<i32> {
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let config = RuntimeConfig::from(args);
    let settings = args.to_settings()?;

    config.section(&format!(
        "Building wheel in {} with Python {}",
        settings.project_dir().display(),
        settings.python_version()
    ));

    let runner = ProcessRunner::new(config.output().clone(), settings.step_timeout());
    let outcome = Bundler::new(settings, runner).run().await;

    if let Some(path) = &args.report {
        outcome
            .report
            .write_json(path)
            .await
            .map_err(|e| CliError::ReportFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        config.progress(&format!("Report written to {}", path.display()));
    }

    print_summary(&config, &outcome.report);

    let artifact = outcome.result?;
    if !args.native_libs.is_empty() && artifact.bundled_libraries.is_empty() {
        config.warn("No shared libraries were embedded in the wheel");
    }
    config.success(&format!(
        "Staged {} ({} bytes, sha256 {})",
        artifact.path.display(),
        artifact.size,
        artifact.sha256
    ));
    Ok(0)
}

fn print_summary(config: &RuntimeConfig, report: &PipelineReport) {
    config.section("Summary");
    for record in &report.steps {
        let line = match &record.detail {
            Some(detail) => format!("{} ({} ms): {}", record.step, record.duration_ms, detail),
            None => format!("{} ({} ms)", record.step, record.duration_ms),
        };
        match record.status {
            StepStatus::Completed => config.success(&line),
            StepStatus::Skipped => config.progress(&format!("skipped {}", line)),
            StepStatus::Failed => config.error(&line),
        }
    }
}
