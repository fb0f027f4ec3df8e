use super::state::{Criticality, ScenarioResult, SuiteSummary};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration as StdDuration;
use tokio::sync::broadcast;

/// Severity of a free-form log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Failure,
}

/// Test execution events for real-time updates
#[derive(Debug, Clone)]
pub enum TestEvent {
    // Suite events
    SuiteStarted {
        run_id: String,
        scenario_count: usize,
        diagnostics_dir: PathBuf,
    },
    SuiteFinished {
        summary: SuiteSummary,
        results: Vec<ScenarioResult>,
    },

    // Scenario events
    ScenarioStarted {
        name: String,
        index: usize,
        total: usize,
    },
    ScenarioFinished {
        result: ScenarioResult,
    },

    // Step events
    StepStarted {
        scenario: String,
        index: usize,
        name: String,
        criticality: Criticality,
    },
    StepPassed {
        scenario: String,
        index: usize,
        duration_ms: u64,
    },
    StepWarned {
        scenario: String,
        index: usize,
        error: String,
        duration_ms: u64,
    },
    StepFailed {
        scenario: String,
        index: usize,
        error: String,
        duration_ms: u64,
    },

    // Diagnostics
    ScreenshotSaved {
        scenario: String,
        label: String,
        path: PathBuf,
    },
    ScreenshotFailed {
        scenario: String,
        label: String,
        error: String,
    },

    Log {
        level: LogLevel,
        message: String,
    },
}

/// Event emitter for broadcasting test events
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<TestEvent>) {
        let (sender, receiver) = broadcast::channel(256);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.sender.subscribe()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(TestEvent::Log {
            level,
            message: message.into(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(LogLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn failure(&self, message: impl Into<String>) {
        self.log(LogLevel::Failure, message);
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

/// Console event listener printing one line per step
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    /// Print events until every emitter is dropped
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        use colored::Colorize;
        use std::io::IsTerminal;

        let interactive = std::io::stdout().is_terminal();
        let mut spinner: Option<ProgressBar> = None;
        let mut step_text = String::new();

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Console listener skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                TestEvent::SuiteStarted {
                    run_id,
                    scenario_count,
                    diagnostics_dir,
                } => {
                    println!(
                        "\n{} Test run {} ({} scenarios)",
                        "▶".green().bold(),
                        run_id.cyan(),
                        scenario_count
                    );
                    println!("  Screenshots: {}", diagnostics_dir.display());
                }

                TestEvent::ScenarioStarted { name, index, total } => {
                    println!("\n{}", "=".repeat(60));
                    println!(
                        "{} [{}/{}] Starting test: {}",
                        "→".blue(),
                        index + 1,
                        total,
                        name.white().bold()
                    );
                    println!("{}", "=".repeat(60));
                }

                TestEvent::StepStarted {
                    index,
                    name,
                    criticality,
                    ..
                } => {
                    step_text = match criticality {
                        Criticality::Critical => format!("[{}] {}", index, name),
                        Criticality::Exploratory => {
                            format!("[{}] {} {}", index, name, "(optional)".dimmed())
                        }
                    };

                    if interactive {
                        let pb = ProgressBar::new_spinner();
                        pb.set_draw_target(ProgressDrawTarget::stdout());
                        if let Ok(style) = ProgressStyle::default_spinner()
                            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                            .template("    {spinner} {msg}")
                        {
                            pb.set_style(style);
                        }
                        pb.set_message(format!("{}... ", step_text));
                        pb.enable_steady_tick(StdDuration::from_millis(100));
                        spinner = Some(pb);
                    }
                }

                TestEvent::StepPassed { duration_ms, .. } => {
                    finish_spinner(&mut spinner);
                    println!("    {} {} ({}ms)", "✓".green(), step_text, duration_ms);
                }

                TestEvent::StepWarned {
                    error, duration_ms, ..
                } => {
                    finish_spinner(&mut spinner);
                    println!(
                        "    {} {} ({}ms): {}",
                        "⚠".yellow(),
                        step_text,
                        duration_ms,
                        error.yellow()
                    );
                }

                TestEvent::StepFailed {
                    error, duration_ms, ..
                } => {
                    finish_spinner(&mut spinner);
                    println!(
                        "    {} {} ({}ms): {}",
                        "✗".red(),
                        step_text,
                        duration_ms,
                        error.red()
                    );
                }

                TestEvent::ScreenshotSaved { path, .. } => {
                    println!("      {} Screenshot saved: {}", "📸", path.display());
                }

                TestEvent::ScreenshotFailed { label, error, .. } => {
                    println!(
                        "      {} Failed to take screenshot '{}': {}",
                        "⚠".yellow(),
                        label,
                        error
                    );
                }

                TestEvent::Log { level, message } => {
                    let marker = match level {
                        LogLevel::Info => "ℹ".blue(),
                        LogLevel::Success => "✅".green(),
                        LogLevel::Warning => "⚠️".yellow(),
                        LogLevel::Failure => "❌".red(),
                    };
                    match spinner {
                        Some(ref pb) => pb.println(format!("      {} {}", marker, message)),
                        None => println!("      {} {}", marker, message),
                    }
                }

                TestEvent::ScenarioFinished { result } => {
                    finish_spinner(&mut spinner);
                    let status = if result.passed() {
                        result.status.to_string().green().bold()
                    } else {
                        result.status.to_string().red().bold()
                    };
                    println!(
                        "{} Finished test: {} [{}] ({}ms)",
                        "←".blue(),
                        result.name,
                        status,
                        result.duration_ms
                    );
                }

                TestEvent::SuiteFinished { summary, results } => {
                    finish_spinner(&mut spinner);
                    println!("{}", crate::report::render_summary(&summary, &results));
                }
            }
        }
    }
}

fn finish_spinner(spinner: &mut Option<ProgressBar>) {
    if let Some(pb) = spinner.take() {
        pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listener_exits_when_emitters_dropped() {
        let (emitter, receiver) = EventEmitter::new();
        let handle = tokio::spawn(ConsoleEventListener::listen(receiver));

        emitter.info("hello");
        emitter.emit(TestEvent::StepStarted {
            scenario: "Login Flow".into(),
            index: 0,
            name: "open login page".into(),
            criticality: Criticality::Critical,
        });
        emitter.emit(TestEvent::StepPassed {
            scenario: "Login Flow".into(),
            index: 0,
            duration_ms: 3,
        });
        drop(emitter);

        tokio::time::timeout(StdDuration::from_secs(2), handle)
            .await
            .expect("listener should stop once the channel closes")
            .unwrap();
    }

    #[test]
    fn test_emit_without_receivers_is_harmless() {
        let emitter = EventEmitter::default();
        emitter.warning("nobody listening");
    }
}
