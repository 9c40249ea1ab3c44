//! Main pipeline orchestration.
//!
//! This module provides the [`Bundler`] orchestrator that runs the wheel
//! pipeline steps in order and stops at the first failure.

use super::checksum::calculate_sha256;
use super::report::{PipelineReport, RunOutcome, StagedArtifact, Step, StepStatus};
use crate::bundler::{
    Result,
    error::ErrorExt,
    platform::bundle_native_libraries,
    process::CommandRunner,
    python::{pip, pyenv, venv},
    settings::Settings,
    smoke,
    stage::stage_wheel,
    wheel::build_wheel,
};
use std::future::Future;
use std::time::Instant;

/// Value produced by a step plus what goes into its report record.
struct StepResult<T> {
    value: T,
    status: StepStatus,
    detail: Option<String>,
}

impl<T> StepResult<T> {
    fn completed(value: T, detail: impl Into<String>) -> Self {
        Self {
            value,
            status: StepStatus::Completed,
            detail: Some(detail.into()),
        }
    }

    fn skipped(value: T, detail: impl Into<String>) -> Self {
        Self {
            value,
            status: StepStatus::Skipped,
            detail: Some(detail.into()),
        }
    }
}

/// Main pipeline orchestrator.
///
/// Runs, strictly in order:
///
/// 1. toolchain installation (skipped when the version is present)
/// 2. virtual environment creation
/// 3. dependency installation
/// 4. wheel build
/// 5. native library bundling
/// 6. smoke test
/// 7. staging
///
/// Nothing is retried or rolled back: a failure leaves the working tree in
/// whatever state the failing step reached.
///
/// # Examples
///
/// ```no_run
/// use wheel_bundler::bundler::{Bundler, ProcessRunner, Settings};
/// use wheel_bundler::cli::OutputManager;
///
/// # async fn example(settings: Settings) -> wheel_bundler::bundler::Result<()> {
/// let runner = ProcessRunner::new(OutputManager::new(false, false), None);
/// let outcome = Bundler::new(settings, runner).run().await;
/// let artifact = outcome.result?;
/// println!("{} ({})", artifact.path.display(), artifact.sha256);
/// # Ok(())
/// # }
/// ```
pub struct Bundler<R> {
    settings: Settings,
    runner: R,
}

impl<R: CommandRunner> Bundler<R> {
    /// Creates a new orchestrator.
    pub fn new(settings: Settings, runner: R) -> Self {
        Self { settings, runner }
    }

    /// Returns a reference to the command runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs the whole pipeline.
    ///
    /// Always returns the report; `result` holds the staged artifact or the
    /// error of the first failing step.
    pub async fn run(&self) -> RunOutcome {
        let mut report =
            PipelineReport::new(self.settings.python_version().clone(), self.settings.repair_tool());
        let result = self.run_steps(&mut report).await;
        report.finish();

        match &result {
            Ok(artifact) => {
                log::info!("Pipeline finished: {}", artifact.path.display());
                report.artifact = Some(artifact.clone());
            }
            Err(e) => log::error!("Pipeline aborted: {}", e),
        }

        RunOutcome { report, result }
    }

    async fn run_steps(&self, report: &mut PipelineReport) -> Result<StagedArtifact> {
        let runner = &self.runner;
        let settings = &self.settings;

        let toolchain = run_step(report, Step::InstallToolchain, async {
            let (toolchain, installed) = pyenv::ensure_installed(runner, settings).await?;
            let location = toolchain.version_dir().display().to_string();
            Ok(if installed {
                StepResult::completed(toolchain, format!("installed {}", location))
            } else {
                StepResult::skipped(toolchain, format!("already present at {}", location))
            })
        })
        .await?;

        let env = run_step(report, Step::CreateEnvironment, async {
            let env =
                venv::create(runner, &toolchain, settings.venv_dir(), settings.project_dir())
                    .await?;
            let detail = env.root().display().to_string();
            Ok(StepResult::completed(env, detail))
        })
        .await?;

        run_step(report, Step::InstallDependencies, async {
            pip::upgrade_build_tools(runner, &env, settings.repair_tool()).await?;
            pip::install_requirements(runner, &env, settings.requirements(), settings.project_dir())
                .await?;
            Ok(StepResult::completed(
                (),
                format!("installed {}", settings.requirements().display()),
            ))
        })
        .await?;

        let wheel = run_step(report, Step::BuildWheel, async {
            let wheel = build_wheel(runner, &env, settings).await?;
            let detail = wheel.display().to_string();
            Ok(StepResult::completed(wheel, detail))
        })
        .await?;

        let bundled = run_step(report, Step::BundleNativeLibraries, async {
            let outcome = bundle_native_libraries(runner, &env, settings, wheel).await?;
            let detail = format!(
                "{} with {} bundled librar{} ({} staged)",
                outcome.wheel.display(),
                outcome.bundled.len(),
                if outcome.bundled.len() == 1 { "y" } else { "ies" },
                outcome.staged.len()
            );
            Ok(StepResult::completed(outcome, detail))
        })
        .await?;

        run_step(report, Step::SmokeTest, async {
            let outcome = smoke::run(runner, &env, settings, &bundled.wheel).await?;
            let detail = format!(
                "{} in {} after removing {} staged cop{}",
                outcome.statement,
                outcome.workdir.display(),
                outcome.removed.len(),
                if outcome.removed.len() == 1 { "y" } else { "ies" }
            );
            Ok(StepResult::completed((), detail))
        })
        .await?;

        run_step(report, Step::Stage, async {
            let path = stage_wheel(&bundled.wheel, settings.output_dir()).await?;
            let size = tokio::fs::metadata(&path)
                .await
                .fs_context("reading artifact metadata", &path)?
                .len();
            let sha256 = calculate_sha256(&path).await?;
            let detail = path.display().to_string();
            Ok(StepResult::completed(
                StagedArtifact {
                    path,
                    size,
                    sha256,
                    bundled_libraries: bundled.bundled.clone(),
                },
                detail,
            ))
        })
        .await
    }
}

/// Runs one step, timing it and recording its outcome in `report`.
async fn run_step<T, F>(report: &mut PipelineReport, step: Step, work: F) -> Result<T>
where
    F: Future<Output = Result<StepResult<T>>>,
{
    log::info!("==> {}", step);
    let started = Instant::now();

    match work.await {
        Ok(StepResult {
            value,
            status,
            detail,
        }) => {
            log::debug!("{} {:?} in {:?}", step, status, started.elapsed());
            report.record(step, status, started.elapsed(), detail);
            Ok(value)
        }
        Err(e) => {
            report.record(step, StepStatus::Failed, started.elapsed(), Some(e.to_string()));
            Err(e)
        }
    }
}
