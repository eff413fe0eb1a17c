use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, first_number, first_text, text, Listing};
use crate::session::Session;

static AVAILABLE_SIZES: LazyLock<Selector> =
    LazyLock::new(|| css("#sizes option.sizeAvailable"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| css("#price"));

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price = first_text(&doc, &[&PRICE])
        .as_deref()
        .and_then(first_number)
        .map(ToOwned::to_owned)
        .ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = doc
        .select(&AVAILABLE_SIZES)
        .filter_map(|opt| first_number(&text(opt)).map(ToOwned::to_owned))
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct Schuh;

#[async_trait]
impl RetailerScraper for Schuh {
    fn key(&self) -> &'static str {
        "schuh"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse).await
    }
}
