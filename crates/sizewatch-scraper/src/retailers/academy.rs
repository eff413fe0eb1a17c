use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, first_text, text, Listing};
use crate::session::Session;

static PRICE: LazyLock<Selector> = LazyLock::new(|| css(r#"span[itemprop="price"]"#));
static SIZE_BUTTONS: LazyLock<Selector> =
    LazyLock::new(|| css(r#"div[class="row m-0 css-1l0z8uk"] button"#));
/// Sold-out buttons render a strike-through icon.
static STRIKE_THROUGH: LazyLock<Selector> = LazyLock::new(|| css("svg"));

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price = first_text(&doc, &[&PRICE]).ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = doc
        .select(&SIZE_BUTTONS)
        .filter(|button| button.select(&STRIKE_THROUGH).next().is_none())
        .map(|button| {
            text(button)
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect::<String>()
        })
        .filter(|size| !size.is_empty())
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct Academy;

#[async_trait]
impl RetailerScraper for Academy {
    fn key(&self) -> &'static str {
        "academy"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse).await
    }
}
