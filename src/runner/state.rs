use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Whether a step failure aborts its scenario
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    /// Failure aborts the scenario
    Critical,
    /// Failure is logged as a warning and the scenario continues
    Exploratory,
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criticality::Critical => write!(f, "critical"),
            Criticality::Exploratory => write!(f, "exploratory"),
        }
    }
}

/// Step execution status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepStatus {
    Running,
    Passed,
    /// Exploratory step failed, scenario went on
    Warned { error: String },
    Failed { error: String },
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepStatus::Running)
    }
}

/// State for a single step
#[derive(Debug, Clone)]
pub struct StepState {
    pub index: usize,
    pub name: String,
    pub criticality: Criticality,
    pub status: StepStatus,
    pub started_at: Instant,
    pub duration_ms: Option<u64>,
}

impl StepState {
    pub fn start(index: usize, name: &str, criticality: Criticality) -> Self {
        Self {
            index,
            name: name.to_string(),
            criticality,
            status: StepStatus::Running,
            started_at: Instant::now(),
            duration_ms: None,
        }
    }

    pub fn pass(&mut self) {
        self.finish(StepStatus::Passed);
    }

    pub fn warn(&mut self, error: String) {
        self.finish(StepStatus::Warned { error });
    }

    pub fn fail(&mut self, error: String) {
        self.finish(StepStatus::Failed { error });
    }

    fn finish(&mut self, status: StepStatus) {
        self.status = status;
        self.duration_ms = Some(self.started_at.elapsed().as_millis() as u64);
    }

    pub fn to_report(&self) -> StepReport {
        StepReport {
            index: self.index,
            name: self.name.clone(),
            criticality: self.criticality,
            status: self.status.clone(),
            duration_ms: self.duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub index: usize,
    pub name: String,
    pub criticality: Criticality,
    pub status: StepStatus,
    pub duration_ms: Option<u64>,
}

/// Final outcome of one scenario
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Passed,
    Failed,
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioStatus::Passed => write!(f, "PASSED"),
            ScenarioStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Detail recorded for every passing scenario
pub const PASSED_DETAIL: &str = "Test completed successfully";

/// Result of one scenario. Created once by the suite runner, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub name: String,
    pub status: ScenarioStatus,
    pub detail: String,
    pub steps: Vec<StepReport>,
    pub screenshots: Vec<String>,
    pub duration_ms: u64,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }

    /// Exploratory steps that failed without failing the scenario
    pub fn warnings(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Warned { .. }))
            .count()
    }
}

/// Collects results for one suite run
#[derive(Debug, Clone)]
pub struct SuiteSession {
    pub run_id: String,
    pub results: Vec<ScenarioResult>,
    pub started_at: Instant,
    pub finished_at: Option<Instant>,
}

impl SuiteSession {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            results: Vec::new(),
            started_at: Instant::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, result: ScenarioResult) {
        self.results.push(result);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
    }

    pub fn summary(&self) -> SuiteSummary {
        let total = self.results.len() as u32;
        let passed = self.results.iter().filter(|r| r.passed()).count() as u32;
        let duration_ms = self
            .finished_at
            .unwrap_or_else(Instant::now)
            .duration_since(self.started_at)
            .as_millis() as u64;

        SuiteSummary {
            run_id: self.run_id.clone(),
            total,
            passed,
            failed: total - passed,
            warnings: self.results.iter().map(|r| r.warnings() as u32).sum(),
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SuiteSummary {
    pub run_id: String,
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub warnings: u32,
    pub duration_ms: u64,
}

impl SuiteSummary {
    /// `passed / total * 100`, 0 for an empty run
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }

    /// Success rate with one decimal, e.g. "75.0%"
    pub fn success_rate_display(&self) -> String {
        format!("{:.1}%", self.success_rate())
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, status: ScenarioStatus) -> ScenarioResult {
        ScenarioResult {
            name: name.to_string(),
            status,
            detail: String::new(),
            steps: Vec::new(),
            screenshots: Vec::new(),
            duration_ms: 0,
        }
    }

    #[test]
    fn test_success_rate_three_of_four() {
        let mut session = SuiteSession::new("run");
        session.record(result("a", ScenarioStatus::Passed));
        session.record(result("b", ScenarioStatus::Failed));
        session.record(result("c", ScenarioStatus::Passed));
        session.record(result("d", ScenarioStatus::Passed));
        session.finish();

        let summary = session.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.success_rate_display(), "75.0%");
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_success_rate_rounding_and_empty() {
        let mut session = SuiteSession::new("run");
        assert_eq!(session.summary().success_rate_display(), "0.0%");

        session.record(result("a", ScenarioStatus::Passed));
        session.record(result("b", ScenarioStatus::Failed));
        session.record(result("c", ScenarioStatus::Failed));
        assert_eq!(session.summary().success_rate_display(), "33.3%");
    }

    #[test]
    fn test_step_lifecycle() {
        let mut step = StepState::start(0, "open login", Criticality::Critical);
        assert!(!step.status.is_terminal());
        step.warn("no link".to_string());
        assert!(step.status.is_terminal());
        assert!(step.duration_ms.is_some());

        let report = step.to_report();
        assert_eq!(report.criticality, Criticality::Critical);
        assert_eq!(
            report.status,
            StepStatus::Warned {
                error: "no link".to_string()
            }
        );
    }

    #[test]
    fn test_warnings_counted() {
        let mut r = result("a", ScenarioStatus::Passed);
        let mut warned = StepState::start(0, "discover link", Criticality::Exploratory);
        warned.warn("absent".into());
        let mut ok = StepState::start(1, "heading", Criticality::Critical);
        ok.pass();
        r.steps = vec![warned.to_report(), ok.to_report()];
        assert_eq!(r.warnings(), 1);
    }
}
