use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, first_text, has_class, text, Listing};
use crate::session::Session;

static SELLING_PRICE: LazyLock<Selector> = LazyLock::new(|| {
    css(r#"div.pdpPrice span[id="dnn_ctr103511_ViewTemplate_ctl00_ctl08_lblSellingPrice"]"#)
});
static ANY_PRICE: LazyLock<Selector> = LazyLock::new(|| css("div.pdpPrice span"));
static SIZE_OPTIONS: LazyLock<Selector> = LazyLock::new(|| css("select.SizeDropDown option"));

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price = first_text(&doc, &[&SELLING_PRICE, &ANY_PRICE])
        .ok_or_else(|| ScrapeError::missing(url, "price"))?;
    // First option is the "Select Size" placeholder.
    let sizes = doc
        .select(&SIZE_OPTIONS)
        .skip(1)
        .filter(|opt| !has_class(*opt, "greyOut"))
        .filter_map(|opt| text(opt).split_whitespace().next().map(ToOwned::to_owned))
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct SportsDirect;

#[async_trait]
impl RetailerScraper for SportsDirect {
    fn key(&self) -> &'static str {
        "sportsdirect"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse).await
    }
}
