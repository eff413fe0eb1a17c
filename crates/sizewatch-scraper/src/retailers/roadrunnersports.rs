use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, text, Listing};
use crate::session::Session;

static SALE_PRICE: LazyLock<Selector> =
    LazyLock::new(|| css(r#"span[class="prod_detail_sale_price"]"#));
static REGULAR_PRICE: LazyLock<Selector> =
    LazyLock::new(|| css(r#"span[class="prod_detail_reg_price"]"#));
static AVAILABLE_SIZES: LazyLock<Selector> = LazyLock::new(|| css("a.size--available"));

/// The page repeats the price block; the last one belongs to the selected
/// width. Shoes that are not on sale have no sale price.
fn last_price(doc: &Html) -> Option<String> {
    [&*SALE_PRICE, &*REGULAR_PRICE].into_iter().find_map(|selector| {
        doc.select(selector)
            .last()
            .map(text)
            .filter(|t| !t.is_empty())
    })
}

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price = last_price(&doc).ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = doc.select(&AVAILABLE_SIZES).map(text).collect();
    Ok(Listing::new(price, sizes))
}

pub struct RoadRunnerSports;

#[async_trait]
impl RetailerScraper for RoadRunnerSports {
    fn key(&self) -> &'static str {
        "roadrunnersports"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse).await
    }
}
