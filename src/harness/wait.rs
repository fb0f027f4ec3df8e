//! Bounded waits and safe element interactions
//!
//! Every wait is a poll: probe the page, sleep `poll_interval`, probe again,
//! until the condition holds or the timeout elapses. Each probe is itself cut
//! off at the deadline. Driver errors seen while polling count as "not yet";
//! the last one is attached to the timeout.

use anyhow::Result;
use std::future::Future;
use std::time::{Duration, Instant};

use super::Harness;
use crate::driver::traits::{ElementRef, Locator};
use crate::error::HarnessError;

impl Harness {
    fn bound(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or_else(|| self.config().timing.default_timeout())
    }

    async fn poll_until<T, F, Fut>(
        &self,
        waited_for: String,
        timeout: Duration,
        mut probe: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let poll_interval = self.config().timing.poll_interval();
        let started = Instant::now();
        let mut attempts = 0u32;
        let mut last_error: Option<anyhow::Error> = None;

        loop {
            attempts += 1;
            // A hung driver call must not stretch the wait past its bound
            let remaining = timeout.saturating_sub(started.elapsed());
            let checked = match tokio::time::timeout(remaining, probe()).await {
                Ok(checked) => checked,
                Err(_) => Err(anyhow::anyhow!(
                    "driver call still pending after {}ms",
                    started.elapsed().as_millis()
                )),
            };
            match checked {
                Ok(Some(value)) => {
                    log::debug!(
                        "{} after {} attempt(s) in {}ms",
                        waited_for,
                        attempts,
                        started.elapsed().as_millis()
                    );
                    return Ok(value);
                }
                Ok(None) => {}
                Err(e) => last_error = Some(e),
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                break;
            }
            tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
        }

        let waited_for = match last_error {
            Some(e) => format!("{} (last error: {:#})", waited_for, e),
            None => waited_for,
        };
        Err(HarnessError::timeout(waited_for, timeout).into())
    }

    /// Wait until an element matching `locator` is in the DOM
    pub async fn wait_for_element(
        &self,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> Result<ElementRef> {
        let driver = self.driver()?;
        self.poll_until(
            format!("element {}", locator),
            self.bound(timeout),
            move || async move { Ok(driver.find_elements(locator).await?.into_iter().next()) },
        )
        .await
    }

    /// Wait until an element matching `locator` is visible and enabled
    pub async fn wait_for_clickable(
        &self,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> Result<ElementRef> {
        let driver = self.driver()?;
        self.poll_until(
            format!("clickable element {}", locator),
            self.bound(timeout),
            move || async move {
                let Some(element) = driver.find_elements(locator).await?.into_iter().next() else {
                    return Ok(None);
                };
                let ready =
                    driver.is_displayed(&element).await? && driver.is_enabled(&element).await?;
                Ok(ready.then_some(element))
            },
        )
        .await
    }

    /// Wait until an element matching `locator` is displayed
    pub async fn wait_for_visible(
        &self,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> Result<ElementRef> {
        let driver = self.driver()?;
        self.poll_until(
            format!("visible element {}", locator),
            self.bound(timeout),
            move || async move {
                for element in driver.find_elements(locator).await? {
                    if driver.is_displayed(&element).await? {
                        return Ok(Some(element));
                    }
                }
                Ok(None)
            },
        )
        .await
    }

    /// Wait until some element matching `locator` shows exactly `expected`
    /// (trimmed)
    pub async fn wait_for_text(
        &self,
        locator: &Locator,
        expected: &str,
        timeout: Option<Duration>,
    ) -> Result<ElementRef> {
        let driver = self.driver()?;
        self.poll_until(
            format!("element {} with text '{}'", locator, expected),
            self.bound(timeout),
            move || async move {
                for element in driver.find_elements(locator).await? {
                    if driver.text(&element).await?.trim() == expected {
                        return Ok(Some(element));
                    }
                }
                Ok(None)
            },
        )
        .await
    }

    /// Wait until the location contains `fragment`. Returns the matching URL.
    pub async fn wait_for_url_contains(
        &self,
        fragment: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let driver = self.driver()?;
        self.poll_until(
            format!("url containing '{}'", fragment),
            self.bound(timeout),
            move || async move {
                let url = driver.current_url().await?;
                Ok(url.contains(fragment).then_some(url))
            },
        )
        .await
    }

    /// Wait until the location no longer contains `fragment`
    pub async fn wait_for_url_leaving(
        &self,
        fragment: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let driver = self.driver()?;
        self.poll_until(
            format!("url leaving '{}'", fragment),
            self.bound(timeout),
            move || async move {
                let url = driver.current_url().await?;
                Ok((!url.contains(fragment)).then_some(url))
            },
        )
        .await
    }

    /// Every element currently matching `locator`, without waiting
    pub async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        let elements = self
            .driver()?
            .find_elements(locator)
            .await
            .map_err(|e| HarnessError::interaction(format!("find {}", locator), format!("{:#}", e)))?;
        Ok(elements)
    }

    /// True when `locator` matches a displayed element right now
    pub async fn is_visible(&self, locator: &Locator) -> bool {
        let Ok(driver) = self.driver() else {
            return false;
        };
        match driver.find_elements(locator).await {
            Ok(elements) => {
                for element in &elements {
                    if driver.is_displayed(element).await.unwrap_or(false) {
                        return true;
                    }
                }
                false
            }
            Err(_) => false,
        }
    }

    /// Fail with `StaleElement` if the page navigated since `element` was found.
    /// Query and fragment changes stay on the same page.
    async fn ensure_attached(&self, element: &ElementRef) -> Result<()> {
        let url = self.current_url().await?;
        if !element.is_on_page(&url) {
            return Err(HarnessError::StaleElement {
                locator: element.to_string(),
                origin_url: element.origin_url.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Clear the field, then type `text`
    pub async fn safe_send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.ensure_attached(element).await?;
        let driver = self.driver()?;
        let action = format!("type into {}", element);
        driver
            .clear(element)
            .await
            .map_err(|e| HarnessError::interaction(&action, format!("{:#}", e)))?;
        driver
            .type_text(element, text)
            .await
            .map_err(|e| HarnessError::interaction(&action, format!("{:#}", e)))?;
        Ok(())
    }

    /// Scroll into view, wait out the settle delay, click
    pub async fn safe_click(&self, element: &ElementRef) -> Result<()> {
        self.scroll_to_element(element).await?;
        // Layout animations have no completion signal to poll for
        tokio::time::sleep(self.config().timing.settle_delay()).await;
        self.ensure_attached(element).await?;
        self.driver()?
            .click(element)
            .await
            .map_err(|e| HarnessError::interaction(format!("click {}", element), format!("{:#}", e)))?;
        Ok(())
    }

    pub async fn scroll_to_element(&self, element: &ElementRef) -> Result<()> {
        self.ensure_attached(element).await?;
        self.driver()?
            .scroll_into_view(element)
            .await
            .map_err(|e| HarnessError::interaction(format!("scroll to {}", element), format!("{:#}", e)))?;
        Ok(())
    }

    /// Pick an `<option>` of a select by value
    pub async fn select_value(&self, element: &ElementRef, value: &str) -> Result<()> {
        self.ensure_attached(element).await?;
        self.driver()?
            .select_option(element, value)
            .await
            .map_err(|e| {
                HarnessError::interaction(format!("select '{}' in {}", value, element), format!("{:#}", e))
            })?;
        Ok(())
    }

    pub async fn attribute_of(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        self.ensure_attached(element).await?;
        let value = self
            .driver()?
            .attribute(element, name)
            .await
            .map_err(|e| HarnessError::interaction(format!("read {} of {}", name, element), format!("{:#}", e)))?;
        Ok(value)
    }

    /// Visible text of an element, trimmed
    pub async fn text_of(&self, element: &ElementRef) -> Result<String> {
        self.ensure_attached(element).await?;
        let text = self
            .driver()?
            .text(element)
            .await
            .map_err(|e| HarnessError::interaction(format!("read text of {}", element), format!("{:#}", e)))?;
        Ok(text.trim().to_string())
    }
}
