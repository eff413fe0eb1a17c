//! adidas and Reebok share a storefront and its availability API:
//! `{origin}/api/products/{sku}/availability`.

use async_trait::async_trait;
use scraper::Html;
use serde::Deserialize;
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{with_header, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{meta_content, origin, product_slug, Listing};
use crate::session::Session;

/// The storefront serves a stripped page to most browser agents.
const STOREFRONT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:64.0) Gecko/20100101 Firefox/64.0";

#[derive(Debug, Deserialize)]
struct Availability {
    variation_list: Vec<Variation>,
}

#[derive(Debug, Deserialize)]
struct Variation {
    size: String,
    #[serde(default)]
    availability_status: String,
}

impl Availability {
    fn in_stock_sizes(self) -> Vec<String> {
        self.variation_list
            .into_iter()
            .filter(|v| v.availability_status == "IN_STOCK")
            .map(|v| v.size)
            .collect()
    }
}

fn availability_url(page_url: &str, sku: &str) -> Result<String, ScrapeError> {
    Ok(format!("{}/api/products/{sku}/availability", origin(page_url)?))
}

/// `(sku, price)` from an adidas product page.
fn parse_adidas_page(url: &str, body: &str) -> Result<(String, String), ScrapeError> {
    let doc = Html::parse_document(body);
    let sku = meta_content(&doc, "sku").ok_or_else(|| ScrapeError::missing(url, "sku"))?;
    let price = meta_content(&doc, "price").ok_or_else(|| ScrapeError::missing(url, "price"))?;
    Ok((sku, price))
}

fn parse_reebok_price(url: &str, body: &str) -> Result<String, ScrapeError> {
    let doc = Html::parse_document(body);
    meta_content(&doc, "price").ok_or_else(|| ScrapeError::missing(url, "price"))
}

pub struct Adidas;

#[async_trait]
impl RetailerScraper for Adidas {
    fn key(&self) -> &'static str {
        "adidas"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        let url = target.url.as_str();
        let headers = with_header(&target.headers, "user-agent", STOREFRONT_USER_AGENT);
        let page = session.get(url, &headers).await?;
        let (sku, price) = parse_adidas_page(url, &page.body)?;

        let availability: Availability = session
            .get_json(&availability_url(url, &sku)?, &headers)
            .await?;
        Listing::new(price, availability.in_stock_sizes()).finish(url)
    }
}

pub struct Reebok;

#[async_trait]
impl RetailerScraper for Reebok {
    fn key(&self) -> &'static str {
        "reebok"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        let url = target.url.as_str();
        let product_id = product_slug(url).ok_or_else(|| ScrapeError::missing(url, "product id"))?;
        let page = session.get(url, &target.headers).await?;
        let price = parse_reebok_price(url, &page.body)?;

        let availability: Availability = session
            .get_json(&availability_url(url, &product_id)?, &target.headers)
            .await?;
        Listing::new(price, availability.in_stock_sizes()).finish(url)
    }
}
