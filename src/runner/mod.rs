pub mod events;
pub mod state;
pub mod step;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

pub use events::*;
pub use state::*;

use crate::driver::traits::DriverLauncher;
use crate::driver::web::PlaywrightLauncher;
use crate::flows::{self, Flow};
use crate::harness::Harness;
use crate::report::{self, types::SuiteResults};
use crate::utils::config::SuiteConfig;
use step::StepRunner;

/// Run the selected scenarios against a real browser
pub async fn run_suite(
    config: SuiteConfig,
    scenarios: &[String],
    write_reports: bool,
) -> Result<SuiteResults> {
    config.validate()?;
    let flows = flows::select(scenarios)?;
    SuiteRunner::new(config, Arc::new(PlaywrightLauncher), flows)
        .with_reports(write_reports)
        .run()
        .await
}

/// Runs flows one after another, each in its own browser session.
///
/// A scenario failure is recorded and the next scenario still runs; only
/// problems outside any scenario (output directory, report files) are
/// returned as errors.
pub struct SuiteRunner {
    config: Arc<SuiteConfig>,
    launcher: Arc<dyn DriverLauncher>,
    flows: Vec<Box<dyn Flow>>,
    write_reports: bool,
}

impl SuiteRunner {
    pub fn new(
        config: SuiteConfig,
        launcher: Arc<dyn DriverLauncher>,
        flows: Vec<Box<dyn Flow>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            launcher,
            flows,
            write_reports: false,
        }
    }

    pub fn with_reports(mut self, enabled: bool) -> Self {
        self.write_reports = enabled;
        self
    }

    /// Run every flow with console output, then print the summary
    pub async fn run(&self) -> Result<SuiteResults> {
        let run_id = format!("run_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
        let diagnostics_dir = run_dir(&self.config.output_dir, &run_id);
        std::fs::create_dir_all(&diagnostics_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                diagnostics_dir.display()
            )
        })?;

        let (emitter, receiver) = EventEmitter::new();
        let listener = tokio::spawn(ConsoleEventListener::listen(receiver));

        let session = self.run_with(&emitter, &run_id, &diagnostics_dir).await;
        let results = SuiteResults::from_session(&session);

        let written = if self.write_reports {
            report::write_results(&results, &diagnostics_dir)
        } else {
            Ok(Vec::new())
        };
        if let Ok(ref paths) = written {
            for path in paths {
                emitter.info(format!("Report saved: {}", path.display()));
            }
        }

        emitter.emit(TestEvent::SuiteFinished {
            summary: results.summary.clone(),
            results: results.scenarios.clone(),
        });

        // Listener stops once the last sender is gone
        drop(emitter);
        if let Err(e) = listener.await {
            log::warn!("Console listener stopped abnormally: {}", e);
        }

        written?;
        Ok(results)
    }

    /// Run every flow, reporting progress through `emitter`
    pub async fn run_with(
        &self,
        emitter: &EventEmitter,
        run_id: &str,
        diagnostics_dir: &Path,
    ) -> SuiteSession {
        let mut session = SuiteSession::new(run_id);
        let total = self.flows.len();

        emitter.emit(TestEvent::SuiteStarted {
            run_id: run_id.to_string(),
            scenario_count: total,
            diagnostics_dir: diagnostics_dir.to_path_buf(),
        });

        for (index, flow) in self.flows.iter().enumerate() {
            emitter.emit(TestEvent::ScenarioStarted {
                name: flow.name().to_string(),
                index,
                total,
            });

            let result = self
                .run_scenario(flow.as_ref(), emitter, diagnostics_dir)
                .await;

            emitter.emit(TestEvent::ScenarioFinished {
                result: result.clone(),
            });
            session.record(result);
        }

        session.finish();
        session
    }

    async fn run_scenario(
        &self,
        flow: &dyn Flow,
        emitter: &EventEmitter,
        diagnostics_dir: &Path,
    ) -> ScenarioResult {
        let started = Instant::now();
        let mut harness = Harness::new(
            self.config.clone(),
            self.launcher.clone(),
            diagnostics_dir,
            emitter.clone(),
        );
        let mut steps = StepRunner::new(flow.name(), emitter.clone());

        let outcome = match harness.set_up(flow.name()).await {
            Ok(()) => flow.run(&mut harness, &mut steps).await,
            Err(e) => Err(e.context("browser setup failed")),
        };
        harness.mark_finished(outcome.is_ok());

        if let Err(ref e) = outcome {
            if harness.has_session() {
                harness.take_screenshot("failure").await;
            }
            emitter.failure(format!("{} failed: {:#}", flow.name(), e));
        } else {
            emitter.success(format!("{} passed", flow.name()));
        }

        harness.tear_down().await;

        let (status, detail) = match outcome {
            Ok(()) => (ScenarioStatus::Passed, PASSED_DETAIL.to_string()),
            Err(e) => (ScenarioStatus::Failed, format!("{:#}", e)),
        };

        ScenarioResult {
            name: flow.name().to_string(),
            status,
            detail,
            steps: steps.reports(),
            screenshots: harness
                .screenshots()
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    pub fn scenario_names(&self) -> Vec<String> {
        self.flows.iter().map(|f| f.name().to_string()).collect()
    }
}

/// Per-run directory under `output_dir` for the given run id
pub fn run_dir(output_dir: &Path, run_id: &str) -> PathBuf {
    output_dir.join(run_id)
}
