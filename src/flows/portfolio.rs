use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use super::auth::sign_in;
use super::{expect_all, expect_heading, routes, Flow};
use crate::driver::traits::Locator;
use crate::harness::Harness;
use crate::runner::step::{Step, StepRunner};
use crate::utils::config::PortfolioSample;

pub const TITLE_FIELD: &str = "input[name='title']";
pub const DESCRIPTION_FIELD: &str = "textarea[name='description']";
pub const LINK_FIELD: &str = "input[name='link']";
pub const CATEGORY_SELECT: &str = "select[name='category']";
pub const TAGS_FIELD: &str = "input[name='tags']";
pub const SUBMIT_BUTTON: &str = "form button[type='submit']";
pub const ITEM_TITLE: &str = ".portfolio-item h3";
pub const SORT_SELECT: &str = "select[name='sort']";

const NAV_LINK_TIMEOUT: Duration = Duration::from_secs(3);
const SORT_ORDER: &str = "newest";

fn form_fields() -> [Locator; 5] {
    [
        Locator::css(TITLE_FIELD),
        Locator::css(DESCRIPTION_FIELD),
        Locator::css(LINK_FIELD),
        Locator::css(CATEGORY_SELECT),
        Locator::css(TAGS_FIELD),
    ]
}

async fn via_nav_link(h: &Harness) -> Result<()> {
    h.navigate(routes::DASHBOARD).await?;
    let bound = h.config().timing.default_timeout().min(NAV_LINK_TIMEOUT);
    let link = h
        .wait_for_clickable(&Locator::link_text("Portfolio"), Some(bound))
        .await?;
    h.safe_click(&link).await?;
    h.wait_for_url_contains(routes::PORTFOLIO, None).await?;
    Ok(())
}

/// Follow the navigation link, falling back to the route itself
async fn open_portfolio(h: &Harness) -> Result<()> {
    if let Err(e) = via_nav_link(h).await {
        log::debug!("Portfolio link path failed: {:#}", e);
        h.emitter()
            .info("Portfolio link not usable, navigating directly");
        h.navigate(routes::PORTFOLIO).await?;
        h.wait_for_url_contains(routes::PORTFOLIO, None).await?;
    }
    Ok(())
}

async fn verify_portfolio_page(h: &Harness) -> Result<()> {
    expect_heading(h, "Portfolio").await?;
    expect_all(h, &form_fields()).await?;
    Ok(())
}

async fn fill_form(h: &Harness, sample: &PortfolioSample) -> Result<()> {
    let [title, description, link, category, tags] = form_fields();

    let el = h.wait_for_element(&title, None).await?;
    h.safe_send_keys(&el, &sample.title).await?;
    let el = h.wait_for_element(&description, None).await?;
    h.safe_send_keys(&el, &sample.description).await?;
    let el = h.wait_for_element(&link, None).await?;
    h.safe_send_keys(&el, &sample.link).await?;
    let el = h.wait_for_element(&category, None).await?;
    h.select_value(&el, &sample.category).await?;
    let el = h.wait_for_element(&tags, None).await?;
    h.safe_send_keys(&el, &sample.tags).await?;
    Ok(())
}

async fn submit_form(h: &Harness) -> Result<()> {
    let submit = h
        .wait_for_clickable(&Locator::css(SUBMIT_BUTTON), None)
        .await?;
    h.safe_click(&submit).await
}

async fn find_in_listing(h: &Harness, title: &str) -> Result<()> {
    h.wait_for_text(&Locator::css(ITEM_TITLE), title, None)
        .await?;
    Ok(())
}

async fn sort_listing(h: &Harness) -> Result<()> {
    let select = h
        .wait_for_element(&Locator::css(SORT_SELECT), None)
        .await?;
    h.select_value(&select, SORT_ORDER).await
}

/// Create a portfolio item and look for it in the listing
pub struct PortfolioFlow;

#[async_trait]
impl Flow for PortfolioFlow {
    fn name(&self) -> &str {
        "Portfolio Flow"
    }

    fn id(&self) -> &str {
        "portfolio"
    }

    async fn run(&self, h: &mut Harness, steps: &mut StepRunner) -> Result<()> {
        let sample = h.config().sample_portfolio.clone();

        sign_in(h, steps).await;

        steps
            .run(Step::critical("open portfolio page"), open_portfolio(h))
            .await?;
        steps
            .run(
                Step::critical("verify portfolio page"),
                verify_portfolio_page(h),
            )
            .await?;
        h.take_screenshot("01_portfolio_page").await;

        steps
            .run(Step::critical("fill portfolio form"), fill_form(h, &sample))
            .await?;
        h.take_screenshot("02_form_filled").await;

        steps
            .run(Step::critical("submit portfolio item"), submit_form(h))
            .await?;
        h.take_screenshot("03_after_submit").await;

        if steps
            .run(
                Step::exploratory("find created item in listing"),
                find_in_listing(h, &sample.title),
            )
            .await?
            .is_some()
        {
            h.emitter()
                .success(format!("Found '{}' in the listing", sample.title));
        }

        if steps
            .run(Step::exploratory("sort listing"), sort_listing(h))
            .await?
            .is_some()
        {
            h.take_screenshot("04_sorted").await;
        }

        h.emitter().success("Portfolio flow completed");
        Ok(())
    }
}
