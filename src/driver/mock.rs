//! In-memory browser used by the unit tests
//!
//! Pages are keyed by URL and hold a flat list of elements. Clicking an
//! element runs its scripted handler against the shared state, which is how
//! tests model navigation, form submission and validation messages.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::driver::traits::{page_of, BrowserDriver, DriverLauncher, ElementRef, Locator};
use crate::utils::config::BrowserOptions;

pub type ClickHandler = Arc<dyn Fn(&mut MockState) + Send + Sync>;

#[derive(Clone)]
pub struct MockElement {
    pub key: String,
    pub locators: Vec<Locator>,
    pub text: String,
    pub value: String,
    pub displayed: bool,
    pub enabled: bool,
    /// Element only exists this long after the page loaded
    pub appears_after: Duration,
    /// Element is disabled until this long after the page loaded
    pub enabled_after: Duration,
    pub attributes: HashMap<String, String>,
    pub on_click: Option<ClickHandler>,
}

impl MockElement {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            locators: Vec::new(),
            text: String::new(),
            value: String::new(),
            displayed: true,
            enabled: true,
            appears_after: Duration::ZERO,
            enabled_after: Duration::ZERO,
            attributes: HashMap::new(),
            on_click: None,
        }
    }

    pub fn matches(mut self, locator: Locator) -> Self {
        self.locators.push(locator);
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = delay;
        self
    }

    pub fn enabled_after(mut self, delay: Duration) -> Self {
        self.enabled_after = delay;
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn on_click<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut MockState) + Send + Sync + 'static,
    {
        self.on_click = Some(Arc::new(handler));
        self
    }

    /// Clicking navigates to `url`
    pub fn links_to(self, url: &str) -> Self {
        let url = url.to_string();
        self.on_click(move |state| state.navigate(&url))
    }
}

/// Shared state of the fake application and the current tab
pub struct MockState {
    pub url: String,
    pub loaded_at: Instant,
    pub pages: HashMap<String, Vec<MockElement>>,
    /// Every driver call, in order, for assertions
    pub calls: Vec<String>,
    pub fail_screenshots: bool,
    /// Navigations to these URL prefixes fail like an unreachable host
    pub unreachable: Vec<String>,
    /// `current_url` blocks this long, like a page stuck mid-navigation
    pub url_delay: Duration,
}

impl MockState {
    pub fn new() -> Self {
        Self {
            url: "about:blank".to_string(),
            loaded_at: Instant::now(),
            pages: HashMap::new(),
            calls: Vec::new(),
            fail_screenshots: false,
            unreachable: Vec::new(),
            url_delay: Duration::ZERO,
        }
    }

    pub fn navigate(&mut self, url: &str) {
        self.url = url.to_string();
        self.loaded_at = Instant::now();
    }

    pub fn page(&mut self, url: &str, elements: Vec<MockElement>) {
        self.pages.insert(url.to_string(), elements);
    }

    /// Append an element to an existing (or new) page
    pub fn add_element(&mut self, url: &str, element: MockElement) {
        self.pages.entry(url.to_string()).or_default().push(element);
    }

    pub fn element(&self, url: &str, key: &str) -> Option<&MockElement> {
        self.pages.get(url)?.iter().find(|e| e.key == key)
    }

    pub fn element_mut(&mut self, url: &str, key: &str) -> Option<&mut MockElement> {
        self.pages.get_mut(url)?.iter_mut().find(|e| e.key == key)
    }

    /// Current value of a form control on `url`
    pub fn value_of(&self, url: &str, key: &str) -> String {
        self.element(url, key)
            .map(|e| e.value.clone())
            .unwrap_or_default()
    }

    pub fn show(&mut self, url: &str, key: &str) {
        if let Some(el) = self.element_mut(url, key) {
            el.displayed = true;
        }
    }

    fn present(&self, element: &MockElement) -> bool {
        self.loaded_at.elapsed() >= element.appears_after
    }

    fn matching(&self, locator: &Locator) -> Vec<&MockElement> {
        self.pages
            .get(page_of(&self.url))
            .map(|elements| {
                elements
                    .iter()
                    .filter(|e| self.present(e) && e.locators.contains(locator))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn resolve_key(&self, element: &ElementRef) -> Result<String> {
        self.matching(&element.locator)
            .get(element.index)
            .map(|e| e.key.clone())
            .ok_or_else(|| anyhow::anyhow!("element {} is no longer attached", element))
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

/// A session over shared [`MockState`]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
    closes: Arc<AtomicUsize>,
}

impl MockDriver {
    pub fn new(state: Arc<Mutex<MockState>>) -> Self {
        Self {
            state,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> Result<T>) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("mock state poisoned"))?;
        f(&mut state)
    }

    fn with_element<T>(
        &self,
        element: &ElementRef,
        call: &str,
        f: impl FnOnce(&mut MockElement) -> T,
    ) -> Result<T> {
        self.with_state(|state| {
            state.calls.push(format!("{} {}", call, element));
            let key = state.resolve_key(element)?;
            let url = page_of(&state.url).to_string();
            let el = state
                .element_mut(&url, &key)
                .ok_or_else(|| anyhow::anyhow!("element {} vanished", element))?;
            Ok(f(el))
        })
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    fn browser_name(&self) -> &str {
        "mock"
    }

    async fn goto(&self, url: &str) -> Result<()> {
        self.with_state(|state| {
            state.calls.push(format!("goto {}", url));
            if state.unreachable.iter().any(|u| url.starts_with(u.as_str())) {
                anyhow::bail!("net::ERR_CONNECTION_REFUSED at {}", url);
            }
            state.navigate(url);
            Ok(())
        })
    }

    async fn current_url(&self) -> Result<String> {
        let delay = self.with_state(|state| Ok(state.url_delay))?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.with_state(|state| Ok(state.url.clone()))
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        self.with_state(|state| {
            let count = state.matching(locator).len();
            Ok((0..count)
                .map(|i| ElementRef::new(locator.clone(), i, state.url.clone()))
                .collect())
        })
    }

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool> {
        self.with_element(element, "displayed?", |el| el.displayed)
    }

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool> {
        let loaded_at = self.with_state(|state| Ok(state.loaded_at))?;
        self.with_element(element, "enabled?", |el| {
            el.enabled && loaded_at.elapsed() >= el.enabled_after
        })
    }

    async fn clear(&self, element: &ElementRef) -> Result<()> {
        self.with_element(element, "clear", |el| el.value.clear())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.with_element(element, "type", |el| el.value.push_str(text))
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        let handler = self.with_element(element, "click", |el| {
            if el.enabled {
                Ok(el.on_click.clone())
            } else {
                Err(anyhow::anyhow!("element {} is disabled", el.key))
            }
        })??;
        if let Some(handler) = handler {
            self.with_state(|state| {
                handler(state);
                Ok(())
            })?;
        }
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()> {
        self.with_element(element, "scroll", |_| ())
    }

    async fn text(&self, element: &ElementRef) -> Result<String> {
        self.with_element(element, "text", |el| {
            if el.text.is_empty() {
                el.value.clone()
            } else {
                el.text.clone()
            }
        })
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        self.with_element(element, "attribute", |el| el.attributes.get(name).cloned())
    }

    async fn select_option(&self, element: &ElementRef, value: &str) -> Result<()> {
        self.with_element(element, "select", |el| el.value = value.to_string())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.with_state(|state| {
            state.calls.push("screenshot".to_string());
            if state.fail_screenshots {
                anyhow::bail!("screenshot capture failed");
            }
            // PNG signature is enough for file assertions
            Ok(vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a])
        })
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.with_state(|state| {
            state.calls.push("close".to_string());
            Ok(())
        })
    }
}

/// Hands out [`MockDriver`]s over one shared application state
#[derive(Clone)]
pub struct MockLauncher {
    pub state: Arc<Mutex<MockState>>,
    pub launches: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    /// Fail every launch with this message
    pub fail_launch: Option<String>,
}

impl MockLauncher {
    pub fn new(state: MockState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            launches: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
            fail_launch: None,
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn driver(&self) -> MockDriver {
        MockDriver {
            state: self.state.clone(),
            closes: self.closes.clone(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DriverLauncher for MockLauncher {
    async fn launch(&self, _options: &BrowserOptions) -> Result<Box<dyn BrowserDriver>> {
        if let Some(ref message) = self.fail_launch {
            anyhow::bail!("{}", message);
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut state) = self.state.lock() {
            state.navigate("about:blank");
        }
        Ok(Box::new(self.driver()))
    }
}
