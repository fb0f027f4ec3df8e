pub mod json;
pub mod junit;
pub mod types;

use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::runner::state::{ScenarioResult, SuiteSummary};
use types::SuiteResults;

/// End-of-run block: counts, success rate, then one line per scenario
pub fn render_summary(summary: &SuiteSummary, results: &[ScenarioResult]) -> String {
    let mut out = String::new();
    let rule = "=".repeat(60);

    out.push_str(&format!("\n{}\n", rule));
    out.push_str(&format!("{}\n", "TEST SUMMARY".bold()));
    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!("Total Tests: {}\n", summary.total));
    out.push_str(&format!(
        "Passed: {}\n",
        summary.passed.to_string().green()
    ));
    out.push_str(&format!("Failed: {}\n", summary.failed.to_string().red()));
    if summary.warnings > 0 {
        out.push_str(&format!(
            "Warnings: {}\n",
            summary.warnings.to_string().yellow()
        ));
    }
    out.push_str(&format!(
        "Success Rate: {}\n",
        summary.success_rate_display().bold()
    ));
    out.push_str(&format!(
        "Duration: {:.1}s\n",
        summary.duration_ms as f64 / 1000.0
    ));

    out.push_str("\nDetailed Results:\n");
    for result in results {
        if result.passed() {
            out.push_str(&format!(
                "  {} {}: {}\n",
                "✓".green(),
                result.name,
                result.status.to_string().green()
            ));
        } else {
            out.push_str(&format!(
                "  {} {}: {}\n",
                "✗".red(),
                result.name,
                result.status.to_string().red()
            ));
            out.push_str(&format!("      Error: {}\n", result.detail));
        }
    }
    out.push_str(&rule);
    out
}

/// Write `results.json` and `junit.xml` into `dir`
pub fn write_results(results: &SuiteResults, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let json_path = dir.join("results.json");
    std::fs::write(&json_path, serde_json::to_string_pretty(results)?)?;
    let junit_path = junit::write_report(results, dir)?;

    Ok(vec![json_path, junit_path])
}

/// Re-render a saved `results.json`
pub fn generate_report(results_path: &Path, format: &str, output: Option<&Path>) -> Result<()> {
    let results = json::load(results_path)?;

    match format {
        "json" => json::generate(&results, output),
        "junit" => {
            let xml = junit::generate_junit_xml(&results)?;
            match output {
                Some(path) => {
                    std::fs::write(path, xml)?;
                    println!("JUnit report saved to: {}", path.display());
                }
                None => println!("{}", xml),
            }
            Ok(())
        }
        "summary" => {
            println!("{}", render_summary(&results.summary, &results.scenarios));
            Ok(())
        }
        _ => anyhow::bail!("Unknown format: {}", format),
    }
}
