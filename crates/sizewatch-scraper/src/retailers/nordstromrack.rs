use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, first_text, meta_content, Listing};
use crate::session::Session;

static SALE_PRICE: LazyLock<Selector> =
    LazyLock::new(|| css(r#"span[class*="pricing-and-style__sale-price"]"#));
static AVAILABLE_SKUS: LazyLock<Selector> =
    LazyLock::new(|| css("label.sku-item.sku-item--available.sku-item--text > input"));

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price = first_text(&doc, &[&SALE_PRICE])
        .or_else(|| meta_content(&doc, "og:price:amount"))
        .ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = doc
        .select(&AVAILABLE_SKUS)
        .filter_map(|input| input.value().attr("value"))
        .map(|v| v.trim().to_owned())
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct NordstromRack;

#[async_trait]
impl RetailerScraper for NordstromRack {
    fn key(&self) -> &'static str {
        "nordstromrack"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse).await
    }
}
