use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, first_text, json_after, Listing};
use crate::session::Session;

static PRICE: LazyLock<Selector> = LazyLock::new(|| css("div.product_price"));

#[derive(Debug, Deserialize)]
struct SizeEntry {
    size: String,
    availability: String,
}

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let price = {
        let doc = Html::parse_document(body);
        first_text(&doc, &[&PRICE]).ok_or_else(|| ScrapeError::missing(url, "price"))?
    };
    let entries: Vec<SizeEntry> = json_after(url, body, "var sizeObj =", "size table")?;
    let sizes = entries
        .into_iter()
        .filter(|e| e.availability == "In Stock")
        .map(|e| e.size.trim().to_owned())
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct Eastbay;

#[async_trait]
impl RetailerScraper for Eastbay {
    fn key(&self) -> &'static str {
        "eastbay"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse).await
    }
}
