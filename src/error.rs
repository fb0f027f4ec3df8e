use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures raised by the harness itself.
///
/// Driver calls made through `Harness` surface as [`HarnessError::Interaction`],
/// or as [`HarnessError::Timeout`] when made inside a bounded wait. Flows see
/// this taxonomy, possibly under an `anyhow` context chain.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A bounded wait did not observe its condition in time.
    #[error("timed out after {:.1}s waiting for {waited_for}", timeout.as_secs_f64())]
    Timeout {
        waited_for: String,
        timeout: Duration,
    },

    /// A located element could not be acted on.
    #[error("{action} failed: {message}")]
    Interaction { action: String, message: String },

    /// The element was located on a page that has since navigated away.
    #[error("stale element reference: {locator} (page navigated from {origin_url})")]
    StaleElement { locator: String, origin_url: String },

    /// Writing a screenshot failed. Only ever logged, never propagated.
    #[error("could not write screenshot {}: {message}", path.display())]
    DiagnosticCapture { path: PathBuf, message: String },

    #[error("no browser session is open (call set_up first)")]
    SessionNotStarted,

    #[error("a browser session is already open for scenario '{0}'")]
    SessionAlreadyOpen(String),
}

impl HarnessError {
    pub fn timeout(waited_for: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            waited_for: waited_for.into(),
            timeout,
        }
    }

    pub fn interaction(action: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Interaction {
            action: action.into(),
            message: err.to_string(),
        }
    }
}

/// Returns true when `err` (or anything in its context chain) is a harness timeout.
pub fn is_timeout(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<HarnessError>(),
            Some(HarnessError::Timeout { .. })
        )
    })
}
