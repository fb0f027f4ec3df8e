use super::types::SuiteResults;
use crate::harness::safe_name;
use crate::runner::state::{ScenarioResult, StepStatus};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::{Path, PathBuf};

fn secs(ms: u64) -> String {
    format!("{:.3}", ms as f64 / 1000.0)
}

/// Generate JUnit XML report string from suite results
pub fn generate_junit_xml(results: &SuiteResults) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let total = results.scenarios.len().to_string();
    let failures = results
        .scenarios
        .iter()
        .filter(|s| !s.passed())
        .count()
        .to_string();
    let time = secs(results.summary.duration_ms);

    // <testsuites>
    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "folio-tester-run"));
    suites_start.push_attribute(("tests", total.as_str()));
    suites_start.push_attribute(("failures", failures.as_str()));
    suites_start.push_attribute(("time", time.as_str()));
    writer.write_event(Event::Start(suites_start))?;

    // One <testsuite> per run
    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", "e2e"));
    suite_start.push_attribute(("tests", total.as_str()));
    suite_start.push_attribute(("failures", failures.as_str()));
    suite_start.push_attribute(("skipped", "0"));
    suite_start.push_attribute(("id", results.run_id.as_str()));
    suite_start.push_attribute(("time", time.as_str()));
    suite_start.push_attribute(("timestamp", results.generated_at.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    for scenario in &results.scenarios {
        write_test_case(&mut writer, scenario)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    scenario: &ScenarioResult,
) -> Result<()> {
    let classname = format!("e2e.{}", safe_name(&scenario.name).to_lowercase());
    let time = secs(scenario.duration_ms);

    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", scenario.name.as_str()));
    case_start.push_attribute(("classname", classname.as_str()));
    case_start.push_attribute(("time", time.as_str()));
    writer.write_event(Event::Start(case_start))?;

    if !scenario.passed() {
        let mut fail_start = BytesStart::new("failure");
        fail_start.push_attribute(("message", scenario.detail.as_str()));
        fail_start.push_attribute(("type", "ScenarioFailure"));
        writer.write_event(Event::Start(fail_start))?;
        writer.write_event(Event::Text(BytesText::new(&scenario.detail)))?;
        writer.write_event(Event::End(BytesEnd::new("failure")))?;
    }

    // Step trail goes to system-out
    if !scenario.steps.is_empty() || !scenario.screenshots.is_empty() {
        let mut out = String::new();
        for step in &scenario.steps {
            let status = match &step.status {
                StepStatus::Running => "RUNNING".to_string(),
                StepStatus::Passed => "PASSED".to_string(),
                StepStatus::Warned { error } => format!("WARNED: {}", error),
                StepStatus::Failed { error } => format!("FAILED: {}", error),
            };
            out.push_str(&format!(
                "[{}] {} ({}) {}\n",
                step.index, step.name, step.criticality, status
            ));
        }
        for shot in &scenario.screenshots {
            out.push_str(&format!("screenshot: {}\n", shot));
        }
        writer.write_event(Event::Start(BytesStart::new("system-out")))?;
        writer.write_event(Event::Text(BytesText::new(&out)))?;
        writer.write_event(Event::End(BytesEnd::new("system-out")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write `junit.xml` into `output_dir`
pub fn write_report(results: &SuiteResults, output_dir: &Path) -> Result<PathBuf> {
    let xml = generate_junit_xml(results)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    Ok(path)
}
