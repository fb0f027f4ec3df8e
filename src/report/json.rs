use super::types::SuiteResults;
use anyhow::Result;
use std::path::Path;

/// Write results as pretty JSON to `output`, or stdout
pub fn generate(results: &SuiteResults, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;

    if let Some(path) = output {
        std::fs::write(path, json)?;
        println!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

pub fn load(path: &Path) -> Result<SuiteResults> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
