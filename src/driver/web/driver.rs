//! Browser session backed by Playwright
//!
//! Drives a Chromium instance through the Playwright protocol. The harness
//! talks to it only through [`BrowserDriver`], so nothing here waits or
//! retries: each method is one remote call.

use anyhow::{Context, Result};
use async_trait::async_trait;
use playwright::api::{Browser, BrowserContext, ElementHandle, Page, Viewport};
use playwright::Playwright;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::driver::traits::{BrowserDriver, DriverLauncher, ElementRef, Locator};
use crate::utils::browser_resolver;
use crate::utils::config::BrowserOptions;

/// Chromium session driven through Playwright
pub struct WebDriver {
    #[allow(dead_code)]
    playwright: Arc<Playwright>,
    browser: Arc<Browser>,
    #[allow(dead_code)]
    context: Arc<BrowserContext>,
    page: Arc<Mutex<Page>>,
}

impl WebDriver {
    /// Launch Chromium with `options` and open a blank page
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;

        let chromium = playwright.chromium();
        let mut launcher = chromium.launcher().headless(options.headless);

        let executable = match options.executable_path {
            Some(ref path) => Some(path.clone()),
            None => browser_resolver::find_chromium()
                .map_err(|e| log::debug!("{}", e))
                .ok(),
        };
        if let Some(ref path) = executable {
            log::info!("Using browser executable: {}", path.display());
            launcher = launcher.executable(path);
        } else {
            log::info!("No browser executable found, using Playwright's bundled Chromium");
        }

        let args = options.launch_args();
        log::debug!("Chromium args: {:?}", args);
        launcher = launcher.args(&args);

        let browser = launcher
            .launch()
            .await
            .context("Failed to launch Chromium")?;

        let context = browser
            .context_builder()
            .build()
            .await
            .context("Failed to create browser context")?;
        let page = context.new_page().await.context("Failed to open page")?;

        page.set_viewport_size(Viewport {
            width: options.window_width as i32,
            height: options.window_height as i32,
        })
        .await?;

        Ok(Self {
            playwright: Arc::new(playwright),
            browser: Arc::new(browser),
            context: Arc::new(context),
            page: Arc::new(Mutex::new(page)),
        })
    }

    /// Re-resolve a handle to the live element it refers to
    async fn resolve(&self, page: &Page, element: &ElementRef) -> Result<ElementHandle> {
        let selector = locator_to_playwright(&element.locator);
        let mut handles = page.query_selector_all(&selector).await?;
        if element.index < handles.len() {
            Ok(handles.swap_remove(element.index))
        } else {
            anyhow::bail!(
                "element {} is no longer attached ({} match(es) left)",
                element,
                handles.len()
            )
        }
    }
}

#[async_trait]
impl BrowserDriver for WebDriver {
    fn browser_name(&self) -> &str {
        "chromium"
    }

    async fn goto(&self, url: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.goto_builder(url)
            .goto()
            .await
            .with_context(|| format!("Failed to navigate to {}", url))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let page = self.page.lock().await;
        let href: String = page.eval("() => window.location.href").await?;
        Ok(href)
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        let page = self.page.lock().await;
        let selector = locator_to_playwright(locator);
        let handles = page.query_selector_all(&selector).await?;
        let origin: String = page.eval("() => window.location.href").await?;
        Ok((0..handles.len())
            .map(|i| ElementRef::new(locator.clone(), i, origin.clone()))
            .collect())
    }

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool> {
        let page = self.page.lock().await;
        let handle = self.resolve(&page, element).await?;
        Ok(handle.is_visible().await?)
    }

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool> {
        let page = self.page.lock().await;
        let handle = self.resolve(&page, element).await?;
        Ok(handle.is_enabled().await?)
    }

    async fn clear(&self, element: &ElementRef) -> Result<()> {
        let page = self.page.lock().await;
        let handle = self.resolve(&page, element).await?;
        handle.fill_builder("").fill().await?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<()> {
        let page = self.page.lock().await;
        let handle = self.resolve(&page, element).await?;
        handle.fill_builder(text).fill().await?;
        Ok(())
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        let page = self.page.lock().await;
        let handle = self.resolve(&page, element).await?;
        handle.click_builder().click().await?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()> {
        let page = self.page.lock().await;
        let handle = self.resolve(&page, element).await?;
        handle.scroll_into_view_if_needed(None).await?;
        Ok(())
    }

    async fn text(&self, element: &ElementRef) -> Result<String> {
        let page = self.page.lock().await;
        let handle = self.resolve(&page, element).await?;
        let text = handle.inner_text().await?;
        if !text.trim().is_empty() {
            return Ok(text);
        }
        // Form controls have no inner text
        Ok(handle.get_attribute("value").await?.unwrap_or_default())
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let page = self.page.lock().await;
        let handle = self.resolve(&page, element).await?;
        Ok(handle.get_attribute(name).await?)
    }

    async fn select_option(&self, element: &ElementRef, value: &str) -> Result<()> {
        let page = self.page.lock().await;
        let handle = self.resolve(&page, element).await?;
        handle
            .select_option_builder()
            .add_value(value.to_string())
            .select_option()
            .await?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let page = self.page.lock().await;
        let bytes = page
            .screenshot_builder()
            .r#type(playwright::api::ScreenshotType::Png)
            .screenshot()
            .await?;
        Ok(bytes)
    }

    async fn close(&self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}

/// Launches one [`WebDriver`] per scenario
#[derive(Debug, Default, Clone)]
pub struct PlaywrightLauncher;

#[async_trait]
impl DriverLauncher for PlaywrightLauncher {
    async fn launch(&self, options: &BrowserOptions) -> Result<Box<dyn BrowserDriver>> {
        Ok(Box::new(WebDriver::launch(options).await?))
    }
}

/// Convert a locator into a Playwright selector string
pub fn locator_to_playwright(locator: &Locator) -> String {
    match locator {
        Locator::Css(css) => css.clone(),
        Locator::XPath(xpath) => format!("xpath={}", xpath),
        Locator::Id(id) => format!("[id={}]", css_string(id)),
        Locator::Name(name) => format!("[name={}]", css_string(name)),
        Locator::ClassName(class) => format!(".{}", class),
        Locator::TagName(tag) => tag.to_lowercase(),
        Locator::LinkText(text) => {
            format!("xpath=//a[normalize-space(.)={}]", xpath_string(text))
        }
        Locator::PartialLinkText(text) => format!(
            "xpath=//a[contains(normalize-space(.), {})]",
            xpath_string(text)
        ),
    }
}

fn css_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// XPath 1.0 has no escapes, so pick the quote the value doesn't contain
fn xpath_string(value: &str) -> String {
    if !value.contains('"') {
        format!("\"{}\"", value)
    } else if !value.contains('\'') {
        format!("'{}'", value)
    } else {
        let parts: Vec<String> = value.split('"').map(|p| format!("\"{}\"", p)).collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}
