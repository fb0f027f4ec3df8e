use crate::utils::config::BrowserOptions;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

/// How to find an element in the page.
///
/// Mirrors the usual WebDriver locator strategies so flows can be written
/// without knowing the backing automation library.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Raw CSS selector
    Css(String),
    /// XPath expression
    XPath(String),
    /// Element id attribute
    Id(String),
    /// Form control name attribute
    Name(String),
    /// Single class name
    ClassName(String),
    /// Tag name (e.g. "h1")
    TagName(String),
    /// Anchor whose normalized text equals the value
    LinkText(String),
    /// Anchor whose normalized text contains the value
    PartialLinkText(String),
}

impl Locator {
    pub fn css(value: impl Into<String>) -> Self {
        Self::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::XPath(value.into())
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::Id(value.into())
    }

    pub fn name(value: impl Into<String>) -> Self {
        Self::Name(value.into())
    }

    pub fn tag(value: impl Into<String>) -> Self {
        Self::TagName(value.into())
    }

    pub fn link_text(value: impl Into<String>) -> Self {
        Self::LinkText(value.into())
    }

    pub fn partial_link_text(value: impl Into<String>) -> Self {
        Self::PartialLinkText(value.into())
    }

    /// Strategy name as shown in logs
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css",
            Locator::XPath(_) => "xpath",
            Locator::Id(_) => "id",
            Locator::Name(_) => "name",
            Locator::ClassName(_) => "class",
            Locator::TagName(_) => "tag",
            Locator::LinkText(_) => "link text",
            Locator::PartialLinkText(_) => "partial link text",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Css(v)
            | Locator::XPath(v)
            | Locator::Id(v)
            | Locator::Name(v)
            | Locator::ClassName(v)
            | Locator::TagName(v)
            | Locator::LinkText(v)
            | Locator::PartialLinkText(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?}", self.strategy(), self.value())
    }
}

/// Handle to an element located in a session.
///
/// This is a lookup handle, not ownership of a DOM node: the driver resolves
/// it again on every action. It is only valid on the page it was found on
/// (`origin_url`), which lets the harness report stale references after a
/// navigation instead of acting on whatever now matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub locator: Locator,
    /// 0-based position among all matches of `locator`
    pub index: usize,
    /// Location of the page when the element was found
    pub origin_url: String,
}

impl ElementRef {
    pub fn new(locator: Locator, index: usize, origin_url: impl Into<String>) -> Self {
        Self {
            locator,
            index,
            origin_url: origin_url.into(),
        }
    }

    /// True when `url` is the same document the element was found on.
    /// Query string and fragment are ignored, so `?sort=` or `#section`
    /// updates made by the app itself do not count as navigation.
    pub fn is_on_page(&self, url: &str) -> bool {
        page_of(url) == page_of(&self.origin_url)
    }
}

/// `url` without its query string and fragment
pub fn page_of(url: &str) -> &str {
    url.find(|c: char| c == '?' || c == '#').map_or(url, |end| &url[..end])
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index == 0 {
            write!(f, "{}", self.locator)
        } else {
            write!(f, "{}[{}]", self.locator, self.index)
        }
    }
}

/// One live browser automation session.
///
/// Every method is a single remote call with no waiting of its own; bounded
/// polling lives in `harness::wait` on top of this trait.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Browser name for logs (e.g. "chromium")
    fn browser_name(&self) -> &str;

    /// Navigate to an absolute URL
    async fn goto(&self, url: &str) -> Result<()>;

    /// Current location of the page
    async fn current_url(&self) -> Result<String>;

    /// All elements currently matching `locator`, in document order
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>>;

    /// Whether the element is visible in the layout
    async fn is_displayed(&self, element: &ElementRef) -> Result<bool>;

    /// Whether the element accepts input (not disabled)
    async fn is_enabled(&self, element: &ElementRef) -> Result<bool>;

    /// Remove the current value of an input element
    async fn clear(&self, element: &ElementRef) -> Result<()>;

    /// Type text into an input element
    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<()>;

    async fn click(&self, element: &ElementRef) -> Result<()>;

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()>;

    /// Visible text of the element (or its value for form controls)
    async fn text(&self, element: &ElementRef) -> Result<String>;

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>>;

    /// Choose an option of a `<select>` element by value
    async fn select_option(&self, element: &ElementRef, value: &str) -> Result<()>;

    /// PNG capture of the current viewport
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Close the session and release the browser
    async fn close(&self) -> Result<()>;
}

/// Creates sessions for the harness.
///
/// The suite runner owns one launcher and asks it for a fresh session per
/// scenario.
#[async_trait]
pub trait DriverLauncher: Send + Sync {
    async fn launch(&self, options: &BrowserOptions) -> Result<Box<dyn BrowserDriver>>;
}
