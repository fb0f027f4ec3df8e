use crate::runner::state::{ScenarioResult, SuiteSession, SuiteSummary};
use serde::{Deserialize, Serialize};

/// Everything a finished run writes to `results.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteResults {
    pub run_id: String,
    pub summary: SuiteSummary,
    pub scenarios: Vec<ScenarioResult>,
    pub generated_at: String,
}

impl SuiteResults {
    pub fn from_session(session: &SuiteSession) -> Self {
        Self {
            run_id: session.run_id.clone(),
            summary: session.summary(),
            scenarios: session.results.clone(),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
