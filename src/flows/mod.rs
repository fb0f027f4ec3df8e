//! User journeys driven against the application under test
//!
//! Each flow is a fixed sequence of [`Step`](crate::runner::step::Step)s. The
//! suite runner owns setup, teardown and the failure screenshot; a flow only
//! drives the page and takes its own per-step screenshots.

pub mod auth;
pub mod connections;
pub mod dashboard;
pub mod portfolio;

use anyhow::Result;
use async_trait::async_trait;

use crate::driver::traits::{ElementRef, Locator};
use crate::harness::Harness;
use crate::runner::step::StepRunner;

/// Application routes
pub mod routes {
    pub const LOGIN: &str = "/login";
    pub const DASHBOARD: &str = "/dashboard";
    pub const PORTFOLIO: &str = "/portfolio";
    pub const CONNECTIONS: &str = "/connections";
    pub const DISCOVER: &str = "/discover";
}

#[async_trait]
pub trait Flow: Send + Sync {
    /// Scenario name used in reports and screenshot file names
    fn name(&self) -> &str;

    /// Short selector accepted by `--scenario`
    fn id(&self) -> &str;

    async fn run(&self, h: &mut Harness, steps: &mut StepRunner) -> Result<()>;
}

/// Every flow, in run order
pub fn all() -> Vec<Box<dyn Flow>> {
    vec![
        Box::new(auth::LoginFlow),
        Box::new(dashboard::DashboardFlow),
        Box::new(portfolio::PortfolioFlow),
        Box::new(connections::ConnectionsFlow),
    ]
}

/// Flows whose id or name matches one of `wanted`, kept in run order.
/// An empty filter selects everything.
pub fn select(wanted: &[String]) -> Result<Vec<Box<dyn Flow>>> {
    if wanted.is_empty() {
        return Ok(all());
    }

    let known = all();
    for name in wanted {
        if !known.iter().any(|f| matches_flow(f.as_ref(), name)) {
            let ids: Vec<&str> = known.iter().map(|f| f.id()).collect();
            anyhow::bail!("Unknown scenario '{}' (available: {})", name, ids.join(", "));
        }
    }

    Ok(known
        .into_iter()
        .filter(|f| wanted.iter().any(|w| matches_flow(f.as_ref(), w)))
        .collect())
}

fn matches_flow(flow: &dyn Flow, wanted: &str) -> bool {
    flow.id().eq_ignore_ascii_case(wanted) || flow.name().eq_ignore_ascii_case(wanted)
}

/// The page's first `<h1>`, trimmed
pub(crate) async fn heading(h: &Harness) -> Result<String> {
    let el = h.wait_for_element(&Locator::tag("h1"), None).await?;
    h.text_of(&el).await
}

/// Fail unless the page heading contains `expected` (case-insensitive)
pub(crate) async fn expect_heading(h: &Harness, expected: &str) -> Result<String> {
    let text = heading(h).await?;
    if !text.to_lowercase().contains(&expected.to_lowercase()) {
        anyhow::bail!("expected heading containing '{}', found '{}'", expected, text);
    }
    Ok(text)
}

/// Wait for every locator, in order
pub(crate) async fn expect_all(h: &Harness, locators: &[Locator]) -> Result<Vec<ElementRef>> {
    let mut found = Vec::with_capacity(locators.len());
    for locator in locators {
        found.push(h.wait_for_element(locator, None).await?);
    }
    Ok(found)
}

#[cfg(test)]
pub(crate) mod app {
    //! Scripted copy of the application's pages for flow tests

    use super::auth::{EMAIL_FIELD, PASSWORD_FIELD, SUBMIT_BUTTON, VALIDATION_ERROR};
    use super::portfolio::{ITEM_TITLE, SORT_SELECT};
    use super::*;
    use crate::driver::mock::{MockElement, MockState};

    pub const BASE: &str = "http://localhost:3000";

    pub fn url(route: &str) -> String {
        format!("{}{}", BASE, route)
    }

    fn h1(text: &str) -> MockElement {
        MockElement::new("h1").matches(Locator::tag("h1")).text(text)
    }

    /// Login accepts `test@example.com`; anything without an `@` shows a
    /// validation message.
    pub fn login_page(state: &mut MockState) {
        let login = url(routes::LOGIN);
        let dashboard = url(routes::DASHBOARD);
        let page = login.clone();
        state.page(
            &login,
            vec![
                h1("Welcome back"),
                MockElement::new("email").matches(Locator::css(EMAIL_FIELD)),
                MockElement::new("password").matches(Locator::css(PASSWORD_FIELD)),
                MockElement::new("error")
                    .matches(Locator::css(VALIDATION_ERROR))
                    .text("Please enter a valid email")
                    .hidden(),
                MockElement::new("submit")
                    .matches(Locator::css(SUBMIT_BUTTON))
                    .text("Sign in")
                    .on_click(move |s| {
                        let email = s.value_of(&page, "email");
                        if !email.contains('@') {
                            s.show(&page, "error");
                        } else if email == "test@example.com" {
                            s.navigate(&dashboard);
                        }
                    }),
            ],
        );
    }

    pub fn dashboard_page(state: &mut MockState, with_discover: bool) {
        let dashboard = url(routes::DASHBOARD);
        let mut elements = vec![
            h1("Dashboard"),
            MockElement::new("stat-items")
                .matches(Locator::css(".stat-card"))
                .text("12\nPortfolio Items"),
            MockElement::new("stat-views")
                .matches(Locator::css(".stat-card"))
                .text("Total Views 1,204"),
            MockElement::new("stat-connections")
                .matches(Locator::css(".stat-card"))
                .text("Connections 5"),
            MockElement::new("portfolio-link")
                .matches(Locator::link_text("Portfolio"))
                .links_to(&url(routes::PORTFOLIO)),
        ];
        if with_discover {
            elements.push(
                MockElement::new("discover-link")
                    .matches(Locator::link_text("Discover"))
                    .attr("href", routes::DISCOVER)
                    .links_to(&url(routes::DISCOVER)),
            );
        }
        state.page(&dashboard, elements);
        state.page(&url(routes::DISCOVER), vec![h1("Discover Creators")]);
    }

    /// Submitting appends an item to the listing
    pub fn portfolio_page(state: &mut MockState, listing_shows_items: bool) {
        let portfolio = url(routes::PORTFOLIO);
        let page = portfolio.clone();
        let mut elements = vec![
            h1("My Portfolio"),
            MockElement::new("title").matches(Locator::css("input[name='title']")),
            MockElement::new("description").matches(Locator::css("textarea[name='description']")),
            MockElement::new("link").matches(Locator::css("input[name='link']")),
            MockElement::new("category").matches(Locator::css("select[name='category']")),
            MockElement::new("tags").matches(Locator::css("input[name='tags']")),
            MockElement::new("submit")
                .matches(Locator::css("form button[type='submit']"))
                .on_click(move |s| {
                    if !listing_shows_items {
                        return;
                    }
                    let title = s.value_of(&page, "title");
                    s.add_element(
                        &page,
                        MockElement::new("created")
                            .matches(Locator::css(ITEM_TITLE))
                            .text(&title),
                    );
                }),
        ];
        if listing_shows_items {
            elements.push(MockElement::new("sort").matches(Locator::css(SORT_SELECT)));
        }
        state.page(&portfolio, elements);
    }

    pub fn connections_page(state: &mut MockState) {
        state.page(
            &url(routes::CONNECTIONS),
            vec![
                h1("Connections"),
                MockElement::new("tab-pending")
                    .matches(Locator::xpath("//button[normalize-space()='Pending']")),
                MockElement::new("card-1").matches(Locator::css(".connection-card")),
                MockElement::new("card-2").matches(Locator::css(".connection-card")),
            ],
        );
    }

    /// The whole application
    pub fn full() -> MockState {
        let mut state = MockState::new();
        login_page(&mut state);
        dashboard_page(&mut state, true);
        portfolio_page(&mut state, true);
        connections_page(&mut state);
        state
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::driver::mock::MockLauncher;
    use crate::harness::tests::harness_with;
    use crate::runner::events::{LogLevel, TestEvent};
    use crate::runner::state::StepReport;
    use tokio::sync::broadcast;

    /// Run one flow to completion against `launcher`
    pub(crate) async fn run_flow(
        flow: &dyn Flow,
        launcher: &MockLauncher,
    ) -> (Result<()>, Vec<StepReport>, Vec<TestEvent>) {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness_with(launcher, dir.path());
        let mut events = h.emitter().subscribe();
        let mut steps = StepRunner::new(flow.name(), h.emitter().clone());

        h.set_up(flow.name()).await.unwrap();
        let outcome = flow.run(&mut h, &mut steps).await;
        h.tear_down().await;

        (outcome, steps.reports(), drain(&mut events))
    }

    pub(crate) fn drain(events: &mut broadcast::Receiver<TestEvent>) -> Vec<TestEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    pub(crate) fn logged(events: &[TestEvent], level: LogLevel, needle: &str) -> bool {
        events.iter().any(|e| {
            matches!(e, TestEvent::Log { level: l, message } if *l == level && message.contains(needle))
        })
    }

    #[test]
    fn test_run_order_and_ids() {
        let names: Vec<String> = all().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(
            names,
            vec!["Login Flow", "Dashboard Flow", "Portfolio Flow", "Connections Flow"]
        );
    }

    #[test]
    fn test_select_keeps_run_order() {
        let picked = select(&["connections".into(), "Login Flow".into()]).unwrap();
        let ids: Vec<&str> = picked.iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["login", "connections"]);

        assert_eq!(select(&[]).unwrap().len(), 4);
        assert!(select(&["checkout".into()]).is_err());
    }

    #[tokio::test]
    async fn test_expect_heading() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::new(app::full());
        let mut h = harness_with(&launcher, dir.path());
        h.set_up("Dashboard Flow").await.unwrap();
        h.navigate(routes::DASHBOARD).await.unwrap();

        assert_eq!(expect_heading(&h, "dashboard").await.unwrap(), "Dashboard");
        let err = expect_heading(&h, "Portfolio").await.unwrap_err();
        assert!(err.to_string().contains("found 'Dashboard'"));
        h.tear_down().await;
    }
}
