//! Per-scenario browser lifecycle and diagnostics
//!
//! A [`Harness`] owns at most one browser session. `set_up` opens it,
//! `tear_down` closes it and may be called any number of times; the suite
//! runner calls it on every exit path of a scenario.

pub mod wait;

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::driver::traits::{BrowserDriver, DriverLauncher};
use crate::error::HarnessError;
use crate::runner::events::{EventEmitter, TestEvent};
use crate::utils::config::SuiteConfig;

/// Lifecycle of a harness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    Idle,
    Running,
    Completed,
    Failed,
}

pub struct Harness {
    config: Arc<SuiteConfig>,
    launcher: Arc<dyn DriverLauncher>,
    driver: Option<Box<dyn BrowserDriver>>,
    state: HarnessState,
    scenario: String,
    diagnostics_dir: PathBuf,
    emitter: EventEmitter,
    screenshots: Vec<PathBuf>,
}

impl Harness {
    pub fn new(
        config: Arc<SuiteConfig>,
        launcher: Arc<dyn DriverLauncher>,
        diagnostics_dir: &Path,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            config,
            launcher,
            driver: None,
            state: HarnessState::Idle,
            scenario: String::new(),
            diagnostics_dir: diagnostics_dir.to_path_buf(),
            emitter,
            screenshots: Vec::new(),
        }
    }

    pub fn state(&self) -> HarnessState {
        self.state
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    pub fn diagnostics_dir(&self) -> &Path {
        &self.diagnostics_dir
    }

    /// Screenshots written by this harness, in capture order
    pub fn screenshots(&self) -> &[PathBuf] {
        &self.screenshots
    }

    pub fn has_session(&self) -> bool {
        self.driver.is_some()
    }

    /// Open a browser session for `scenario`
    pub async fn set_up(&mut self, scenario: &str) -> Result<()> {
        if self.driver.is_some() {
            return Err(HarnessError::SessionAlreadyOpen(self.scenario.clone()).into());
        }

        self.scenario = scenario.to_string();
        let options = &self.config.browser;
        log::info!(
            "Launching browser for '{}' (headless: {}, {}x{})",
            scenario,
            options.headless,
            options.window_width,
            options.window_height
        );

        let driver = self.launcher.launch(options).await?;
        self.emitter.info(format!(
            "Browser session started for {} ({})",
            scenario,
            driver.browser_name()
        ));
        self.driver = Some(driver);
        self.state = HarnessState::Running;
        Ok(())
    }

    /// Record how the scenario body ended
    pub fn mark_finished(&mut self, passed: bool) {
        if self.state == HarnessState::Running {
            self.state = if passed {
                HarnessState::Completed
            } else {
                HarnessState::Failed
            };
        }
    }

    /// Close the session if one is open. Safe to call from any state.
    pub async fn tear_down(&mut self) {
        let Some(driver) = self.driver.take() else {
            return;
        };

        if let Err(e) = driver.close().await {
            log::warn!("Closing browser for '{}' failed: {:#}", self.scenario, e);
        }
        self.emitter
            .info(format!("Browser session closed for {}", self.scenario));
    }

    /// The live session
    pub fn driver(&self) -> Result<&dyn BrowserDriver, HarnessError> {
        self.driver
            .as_deref()
            .ok_or(HarnessError::SessionNotStarted)
    }

    /// Navigate to an app route (or absolute URL)
    pub async fn navigate(&self, route: &str) -> Result<()> {
        let url = self.config.url(route);
        log::debug!("Navigating to {}", url);
        self.driver()?
            .goto(&url)
            .await
            .map_err(|e| HarnessError::interaction(format!("navigate to {}", url), format!("{:#}", e)))?;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String> {
        let url = self
            .driver()?
            .current_url()
            .await
            .map_err(|e| HarnessError::interaction("read current url", format!("{:#}", e)))?;
        Ok(url)
    }

    /// Capture the viewport to `<diagnostics>/<scenario>_<label>.png`.
    ///
    /// Never fails: a capture or write error is logged and `None` returned.
    pub async fn take_screenshot(&mut self, label: &str) -> Option<PathBuf> {
        let path = self.screenshot_path(label);
        match self.capture_to(&path).await {
            Ok(()) => {
                self.emitter.emit(TestEvent::ScreenshotSaved {
                    scenario: self.scenario.clone(),
                    label: label.to_string(),
                    path: path.clone(),
                });
                self.screenshots.push(path.clone());
                Some(path)
            }
            Err(e) => {
                let err = HarnessError::DiagnosticCapture {
                    path,
                    message: format!("{:#}", e),
                };
                log::warn!("{}", err);
                self.emitter.emit(TestEvent::ScreenshotFailed {
                    scenario: self.scenario.clone(),
                    label: label.to_string(),
                    error: err.to_string(),
                });
                None
            }
        }
    }

    async fn capture_to(&self, path: &Path) -> Result<()> {
        let bytes = self.driver()?.screenshot().await?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Never overwrite an earlier capture
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(&bytes)?;
        Ok(())
    }

    /// First free `<scenario>_<label>[_n].png` path
    fn screenshot_path(&self, label: &str) -> PathBuf {
        let stem = format!("{}_{}", safe_name(&self.scenario), safe_name(label));
        let mut path = self.diagnostics_dir.join(format!("{}.png", stem));
        let mut n = 2;
        while path.exists() {
            path = self.diagnostics_dir.join(format!("{}_{}.png", stem, n));
            n += 1;
        }
        path
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        if self.driver.is_some() {
            log::warn!(
                "Harness for '{}' dropped with an open session; browser is killed without a clean close",
                self.scenario
            );
        }
    }
}

/// File-name safe version of a scenario name or label
pub fn safe_name(name: &str) -> String {
    let mapped: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if mapped.is_empty() {
        "unnamed".to_string()
    } else {
        mapped
    }
}
