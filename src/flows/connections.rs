use anyhow::Result;
use async_trait::async_trait;

use super::auth::sign_in;
use super::{expect_heading, routes, Flow};
use crate::driver::traits::Locator;
use crate::harness::Harness;
use crate::runner::step::{Step, StepRunner};

pub const CONNECTION_CARD: &str = ".connection-card";
pub const SEARCH_FIELD: &str = "input[placeholder*='Search']";

/// Tabs of the connections page other than the default one
const TABS: [&str; 2] = ["Pending", "Suggestions"];

fn tab(label: &str) -> Locator {
    Locator::xpath(format!("//button[normalize-space()='{}']", label))
}

async fn open_connections(h: &Harness) -> Result<()> {
    h.navigate(routes::CONNECTIONS).await?;
    expect_heading(h, "Connections").await?;
    Ok(())
}

async fn count_connections(h: &Harness) -> Result<usize> {
    Ok(h.find_all(&Locator::css(CONNECTION_CARD)).await?.len())
}

async fn open_tab(h: &Harness, label: &str) -> Result<()> {
    let button = h.wait_for_clickable(&tab(label), None).await?;
    h.safe_click(&button).await
}

async fn search(h: &Harness, query: &str) -> Result<()> {
    let field = h
        .wait_for_element(&Locator::css(SEARCH_FIELD), None)
        .await?;
    h.safe_send_keys(&field, query).await
}

/// Connections page identity and its optional tabs and search
pub struct ConnectionsFlow;

#[async_trait]
impl Flow for ConnectionsFlow {
    fn name(&self) -> &str {
        "Connections Flow"
    }

    fn id(&self) -> &str {
        "connections"
    }

    async fn run(&self, h: &mut Harness, steps: &mut StepRunner) -> Result<()> {
        sign_in(h, steps).await;

        steps
            .run(
                Step::critical("open connections page"),
                open_connections(h),
            )
            .await?;
        h.take_screenshot("01_connections").await;

        if let Some(count) = steps
            .run(Step::exploratory("count connections"), count_connections(h))
            .await?
        {
            h.emitter().info(format!("{} connection(s) listed", count));
        }

        for label in TABS {
            let opened = steps
                .run(
                    Step::exploratory(format!("open {} tab", label)),
                    open_tab(h, label),
                )
                .await?;
            if opened.is_some() {
                h.take_screenshot(&format!("02_{}_tab", label.to_lowercase()))
                    .await;
            }
        }

        if steps
            .run(Step::exploratory("search creators"), search(h, "test"))
            .await?
            .is_some()
        {
            h.take_screenshot("03_search").await;
        }

        h.emitter().success("Connections flow completed");
        Ok(())
    }
}
