use anyhow::Result;
use std::future::Future;

use super::events::{EventEmitter, TestEvent};
use super::state::{Criticality, StepReport, StepState};

/// A named flow step tagged with its failure policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Critical(String),
    Exploratory(String),
}

impl Step {
    pub fn critical(name: impl Into<String>) -> Self {
        Step::Critical(name.into())
    }

    pub fn exploratory(name: impl Into<String>) -> Self {
        Step::Exploratory(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Step::Critical(name) | Step::Exploratory(name) => name,
        }
    }

    pub fn criticality(&self) -> Criticality {
        match self {
            Step::Critical(_) => Criticality::Critical,
            Step::Exploratory(_) => Criticality::Exploratory,
        }
    }
}

/// Runs the steps of one scenario and applies their failure policy.
///
/// A critical failure is returned as `Err` so `?` aborts the flow. An
/// exploratory failure is recorded as a warning and turned into `Ok(None)`.
pub struct StepRunner {
    scenario: String,
    emitter: EventEmitter,
    steps: Vec<StepState>,
}

impl StepRunner {
    pub fn new(scenario: &str, emitter: EventEmitter) -> Self {
        Self {
            scenario: scenario.to_string(),
            emitter,
            steps: Vec::new(),
        }
    }

    pub async fn run<T, F>(&mut self, step: Step, action: F) -> Result<Option<T>>
    where
        F: Future<Output = Result<T>>,
    {
        let index = self.steps.len();
        let criticality = step.criticality();
        self.steps
            .push(StepState::start(index, step.name(), criticality));
        self.emitter.emit(TestEvent::StepStarted {
            scenario: self.scenario.clone(),
            index,
            name: step.name().to_string(),
            criticality,
        });

        let outcome = action.await;
        let state = &mut self.steps[index];

        match outcome {
            Ok(value) => {
                state.pass();
                self.emitter.emit(TestEvent::StepPassed {
                    scenario: self.scenario.clone(),
                    index,
                    duration_ms: state.duration_ms.unwrap_or_default(),
                });
                Ok(Some(value))
            }
            Err(e) => {
                let error = format!("{:#}", e);
                match step {
                    Step::Critical(name) => {
                        state.fail(error.clone());
                        self.emitter.emit(TestEvent::StepFailed {
                            scenario: self.scenario.clone(),
                            index,
                            error,
                            duration_ms: state.duration_ms.unwrap_or_default(),
                        });
                        Err(e.context(name))
                    }
                    Step::Exploratory(name) => {
                        log::warn!("[{}] optional step '{}' failed: {}", self.scenario, name, error);
                        state.warn(error.clone());
                        self.emitter.emit(TestEvent::StepWarned {
                            scenario: self.scenario.clone(),
                            index,
                            error,
                            duration_ms: state.duration_ms.unwrap_or_default(),
                        });
                        Ok(None)
                    }
                }
            }
        }
    }

    pub fn reports(&self) -> Vec<StepReport> {
        self.steps.iter().map(|s| s.to_report()).collect()
    }
}
