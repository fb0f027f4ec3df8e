pub mod driver;

pub use driver::{locator_to_playwright, PlaywrightLauncher, WebDriver};
