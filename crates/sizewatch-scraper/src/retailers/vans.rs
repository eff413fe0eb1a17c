//! Vans: the page carries the catalog entry id and price; stock comes from
//! the WebSphere availability endpoint.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::RetailerScraper;
use crate::error::ScrapeError;
use crate::extract::{attr, css, meta_content, origin, scalar, Listing};
use crate::session::Session;

static CATALOG_ENTRY: LazyLock<Selector> = LazyLock::new(|| css(r#"input[name="catEntryId"]"#));

const SIZE_ATTRIBUTE: &str = "7000000000000000452";

#[derive(Debug, Deserialize)]
struct Availability {
    stock: HashMap<String, f64>,
    attributes: HashMap<String, Vec<SizeEntry>>,
}

#[derive(Debug, Deserialize)]
struct SizeEntry {
    #[serde(rename = "catentryId")]
    catentry_id: Vec<serde_json::Value>,
    display: String,
}

impl Availability {
    fn in_stock_sizes(mut self, url: &str) -> Result<Vec<String>, ScrapeError> {
        let stocked: Vec<&String> = self
            .stock
            .iter()
            .filter(|(_, qty)| **qty > 0.0)
            .map(|(id, _)| id)
            .collect();
        let entries = self
            .attributes
            .remove(SIZE_ATTRIBUTE)
            .ok_or_else(|| ScrapeError::missing(url, "size attribute"))?;
        Ok(entries
            .into_iter()
            .filter(|entry| {
                entry
                    .catentry_id
                    .first()
                    .and_then(scalar)
                    .is_some_and(|id| stocked.iter().any(|s| **s == id))
            })
            .map(|entry| entry.display)
            .collect())
    }
}

/// `(catalog entry id, price)` from the product page.
fn parse_page(url: &str, body: &str) -> Result<(String, String), ScrapeError> {
    let doc = Html::parse_document(body);
    let entry_id =
        attr(&doc, &CATALOG_ENTRY, "value").ok_or_else(|| ScrapeError::missing(url, "catEntryId"))?;
    let price =
        meta_content(&doc, "og:price:amount").ok_or_else(|| ScrapeError::missing(url, "price"))?;
    Ok((entry_id, price))
}

fn availability_url(page_url: &str, entry_id: &str) -> Result<String, ScrapeError> {
    Ok(format!(
        "{}/webapp/wcs/stores/servlet/VFAjaxProductAvailabilityView?productId={entry_id}&storeId=10153&langId=-1&requesttype=ajax",
        origin(page_url)?
    ))
}

pub struct Vans;

#[async_trait]
impl RetailerScraper for Vans {
    fn key(&self) -> &'static str {
        "vans"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        let url = target.url.as_str();
        let page = session.get(url, &target.headers).await?;
        let (entry_id, price) = parse_page(url, &page.body)?;

        let availability: Availability = session
            .get_json(&availability_url(url, &entry_id)?, &target.headers)
            .await?;
        Listing::new(price, availability.in_stock_sizes(url)?).finish(url)
    }
}
