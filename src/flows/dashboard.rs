use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;

use super::auth::sign_in;
use super::{expect_heading, routes, Flow};
use crate::driver::traits::Locator;
use crate::harness::Harness;
use crate::runner::step::{Step, StepRunner};

pub const STAT_CARD: &str = ".stat-card";

/// Optional links are looked up with a short bound
const OPTIONAL_LINK_TIMEOUT: Duration = Duration::from_secs(3);

/// One dashboard statistic card, e.g. "12 Portfolio Items"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatReading {
    pub label: String,
    pub value: u64,
}

/// Parse the leading count and label out of stat card texts.
///
/// The count may sit before or after the label and may use thousands
/// separators. Cards without a number are skipped.
pub fn parse_stats(texts: &[String]) -> Result<Vec<StatReading>> {
    let number = Regex::new(r"\d[\d,]*")?;
    let mut stats = Vec::new();

    for text in texts {
        let Some(m) = number.find(text) else {
            continue;
        };
        let value: u64 = m.as_str().replace(',', "").parse()?;
        let label = format!("{} {}", &text[..m.start()], &text[m.end()..])
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        stats.push(StatReading { label, value });
    }
    Ok(stats)
}

async fn open_dashboard(h: &Harness) -> Result<()> {
    h.navigate(routes::DASHBOARD).await?;
    h.wait_for_url_contains(routes::DASHBOARD, None).await?;
    Ok(())
}

async fn read_stats(h: &Harness) -> Result<Vec<StatReading>> {
    h.wait_for_element(&Locator::css(STAT_CARD), None).await?;
    let mut texts = Vec::new();
    for card in h.find_all(&Locator::css(STAT_CARD)).await? {
        texts.push(h.text_of(&card).await?);
    }
    let stats = parse_stats(&texts)?;
    if stats.is_empty() {
        anyhow::bail!("{} stat cards found but none shows a count", texts.len());
    }
    Ok(stats)
}

async fn follow_discover_link(h: &Harness) -> Result<()> {
    let bound = h.config().timing.default_timeout().min(OPTIONAL_LINK_TIMEOUT);
    let link = h
        .wait_for_clickable(&Locator::link_text("Discover"), Some(bound))
        .await?;
    if let Some(href) = h.attribute_of(&link, "href").await? {
        log::debug!("Discover link points at {}", href);
    }
    h.safe_click(&link).await?;
    h.wait_for_url_contains(routes::DISCOVER, None).await?;
    Ok(())
}

/// Dashboard identity, statistics and the optional Discover link
pub struct DashboardFlow;

#[async_trait]
impl Flow for DashboardFlow {
    fn name(&self) -> &str {
        "Dashboard Flow"
    }

    fn id(&self) -> &str {
        "dashboard"
    }

    async fn run(&self, h: &mut Harness, steps: &mut StepRunner) -> Result<()> {
        sign_in(h, steps).await;

        steps
            .run(Step::critical("open dashboard"), open_dashboard(h))
            .await?;
        h.take_screenshot("01_dashboard").await;

        steps
            .run(
                Step::critical("verify dashboard heading"),
                expect_heading(h, "Dashboard"),
            )
            .await?;

        if let Some(stats) = steps
            .run(Step::exploratory("read statistics"), read_stats(h))
            .await?
        {
            for stat in &stats {
                h.emitter().info(format!("{}: {}", stat.label, stat.value));
            }
        }

        let discovered = steps
            .run(
                Step::exploratory("follow Discover link"),
                follow_discover_link(h),
            )
            .await?;
        if discovered.is_some() {
            h.take_screenshot("02_discover").await;
        }

        h.emitter().success("Dashboard flow completed");
        Ok(())
    }
}
