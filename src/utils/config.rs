use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Suite configuration
///
/// Every field has a default so a config file only needs the values it
/// changes. Precedence: defaults, then the YAML file, then `FOLIO_*`
/// environment variables, then CLI flags (applied by `main`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SuiteConfig {
    /// Base URL of the application under test
    pub base_url: String,

    /// Base URL of the application's API. Not called by the harness yet.
    pub api_url: String,

    /// Existing account used by every authenticated flow
    pub credentials: Credentials,

    /// Data submitted by the portfolio flow
    pub sample_portfolio: PortfolioSample,

    pub browser: BrowserOptions,

    pub timing: Timing,

    /// Root directory for per-run screenshots and result files
    pub output_dir: PathBuf,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_url: "http://localhost:5000/api".to_string(),
            credentials: Credentials::default(),
            sample_portfolio: PortfolioSample::default(),
            browser: BrowserOptions::default(),
            timing: Timing::default(),
            output_dir: PathBuf::from("./output"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioSample {
    pub title: String,
    pub description: String,
    pub link: String,
    pub category: String,
    pub tags: String,
}

impl Default for PortfolioSample {
    fn default() -> Self {
        Self {
            title: "Test Portfolio Item".to_string(),
            description: "This is a test portfolio item created by automated testing".to_string(),
            link: "https://example.com/test-portfolio".to_string(),
            category: "music".to_string(),
            tags: "test, automation, portfolio".to_string(),
        }
    }
}

/// Browser launch options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowserOptions {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Pass `--no-sandbox` style flags (needed inside containers)
    pub no_sandbox: bool,
    /// Extra command line switches for the browser
    pub extra_args: Vec<String>,
    /// Explicit browser executable, otherwise discovered
    pub executable_path: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            no_sandbox: true,
            extra_args: Vec::new(),
            executable_path: None,
        }
    }
}

impl BrowserOptions {
    /// Command line switches passed to Chromium
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.no_sandbox {
            args.extend(
                [
                    "--no-sandbox",
                    "--disable-setuid-sandbox",
                    "--disable-dev-shm-usage",
                ]
                .iter()
                .map(|s| s.to_string()),
            );
        }
        args.push("--disable-gpu".to_string());
        args.push(format!(
            "--window-size={},{}",
            self.window_width, self.window_height
        ));
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Waiting and settle intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Timing {
    /// Bound for element and URL waits
    pub default_timeout_secs: u64,

    /// Delay between two polls of a wait condition
    pub poll_interval_ms: u64,

    /// Pause between scrolling an element into view and clicking it
    pub settle_delay_ms: u64,

    /// Bound for the location to leave the login page after submitting
    pub login_settle_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            default_timeout_secs: 10,
            poll_interval_ms: 250,
            settle_delay_ms: 500,
            login_settle_ms: 3000,
        }
    }
}

impl Timing {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }
}

impl SuiteConfig {
    /// Load defaults, the optional YAML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Override values from `FOLIO_*` variables using `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FOLIO_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("FOLIO_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = lookup("FOLIO_EMAIL") {
            self.credentials.email = v;
        }
        if let Some(v) = lookup("FOLIO_PASSWORD") {
            self.credentials.password = v;
        }
        if let Some(v) = lookup("FOLIO_HEADLESS") {
            self.browser.headless = v == "true" || v == "1";
        }
        if let Some(v) = lookup("FOLIO_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("baseUrl", &self.base_url), ("apiUrl", &self.api_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("{} must be an http(s) URL, got '{}'", name, url);
            }
        }
        if self.timing.default_timeout_secs == 0 {
            anyhow::bail!("timing.defaultTimeoutSecs must be greater than zero");
        }
        if self.timing.poll_interval_ms == 0 {
            anyhow::bail!("timing.pollIntervalMs must be greater than zero");
        }
        Ok(())
    }

    /// Join an app route onto the base URL
    pub fn url(&self, route: &str) -> String {
        if route.starts_with("http://") || route.starts_with("https://") {
            return route.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SuiteConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert!(config.browser.headless);
        assert_eq!(config.timing.default_timeout(), Duration::from_secs(10));
        assert_eq!(config.timing.settle_delay(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
baseUrl: "https://staging.example.com"
credentials:
  email: qa@example.com
timing:
  defaultTimeoutSecs: 20
"#;
        let config = SuiteConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.base_url, "https://staging.example.com");
        assert_eq!(config.credentials.email, "qa@example.com");
        assert_eq!(config.credentials.password, "password123");
        assert_eq!(config.timing.default_timeout_secs, 20);
        assert_eq!(config.timing.poll_interval_ms, 250);
        assert_eq!(config.sample_portfolio.category, "music");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = SuiteConfig::from_yaml("  \n").unwrap();
        assert_eq!(config.api_url, "http://localhost:5000/api");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FOLIO_BASE_URL", "http://app:8080"),
            ("FOLIO_HEADLESS", "0"),
            ("FOLIO_PASSWORD", "s3cret"),
        ]
        .into_iter()
        .collect();

        let mut config = SuiteConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.base_url, "http://app:8080");
        assert!(!config.browser.headless);
        assert_eq!(config.credentials.password, "s3cret");
        assert_eq!(config.credentials.email, "test@example.com");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SuiteConfig::default();
        config.base_url = "localhost:3000".to_string();
        assert!(config.validate().is_err());

        let mut config = SuiteConfig::default();
        config.timing.default_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_url_join() {
        let mut config = SuiteConfig::default();
        config.base_url = "http://localhost:3000/".to_string();
        assert_eq!(config.url("/login"), "http://localhost:3000/login");
        assert_eq!(config.url("dashboard"), "http://localhost:3000/dashboard");
        assert_eq!(config.url("https://other/x"), "https://other/x");
    }

    #[test]
    fn test_launch_args() {
        let options = BrowserOptions::default();
        let args = options.launch_args();
        assert!(args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&"--window-size=1920,1080".to_string()));

        let sandboxed = BrowserOptions {
            no_sandbox: false,
            ..BrowserOptions::default()
        };
        assert!(!sandboxed.launch_args().contains(&"--no-sandbox".to_string()));
    }
}
