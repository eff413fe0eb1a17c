use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, first_number, first_text, text, Listing};
use crate::session::Session;

static PRICE: LazyLock<Selector> = LazyLock::new(|| css("span.price"));
static SIZE_SELECT: LazyLock<Selector> = LazyLock::new(|| css(r#"select[name="size"]"#));
static OPTION: LazyLock<Selector> = LazyLock::new(|| css("option"));

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price = first_text(&doc, &[&PRICE]).ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let select = doc
        .select(&SIZE_SELECT)
        .next()
        .ok_or_else(|| ScrapeError::missing(url, "size select"))?;
    let sizes = select
        .select(&OPTION)
        .map(text)
        .filter(|t| t.contains("in stock"))
        .filter_map(|t| first_number(&t).map(ToOwned::to_owned))
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct Spartoo;

#[async_trait]
impl RetailerScraper for Spartoo {
    fn key(&self) -> &'static str {
        "spartoo"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse).await
    }
}
