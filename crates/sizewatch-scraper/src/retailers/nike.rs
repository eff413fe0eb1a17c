use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, meta_content, Listing};
use crate::session::Session;

static SKU_INPUTS: LazyLock<Selector> =
    LazyLock::new(|| css(r#"div[name="skuAndSize"] input"#));

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price =
        meta_content(&doc, "og:price:amount").ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = doc
        .select(&SKU_INPUTS)
        .filter(|input| input.value().attr("disabled").is_none())
        .filter_map(|input| input.value().attr("aria-label"))
        .map(ToOwned::to_owned)
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct Nike;

#[async_trait]
impl RetailerScraper for Nike {
    fn key(&self) -> &'static str {
        "nike"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse).await
    }
}
