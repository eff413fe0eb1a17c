use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{attr, css, first_number, text, Listing};
use crate::session::Session;

static SIZE_OPTIONS: LazyLock<Selector> = LazyLock::new(|| css("#sizeShoe option"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| css("#now_price"));

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price =
        attr(&doc, &PRICE, "data-value").ok_or_else(|| ScrapeError::missing(url, "price"))?;
    // The "Select size" placeholder carries no number and is skipped.
    let sizes = doc
        .select(&SIZE_OPTIONS)
        .filter(|opt| opt.value().attr("disabled").is_none())
        .filter_map(|opt| first_number(&text(opt)).map(ToOwned::to_owned))
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct Offspring;

#[async_trait]
impl RetailerScraper for Offspring {
    fn key(&self) -> &'static str {
        "offspring"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse).await
    }
}
