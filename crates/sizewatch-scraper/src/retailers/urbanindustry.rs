use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, meta_content, text, Listing};
use crate::session::Session;

static SIZE_LABELS: LazyLock<Selector> = LazyLock::new(|| css(".choices-eh li label"));

/// Sold-out labels are the only ones carrying a `class` attribute.
fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price =
        meta_content(&doc, "og:price:amount").ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = doc
        .select(&SIZE_LABELS)
        .filter(|label| label.value().attr("class").is_none())
        .map(|label| text(label).replace("UK", "").trim().to_owned())
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct UrbanIndustry;

#[async_trait]
impl RetailerScraper for UrbanIndustry {
    fn key(&self) -> &'static str {
        "urbanindustry"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse).await
    }
}
