//! Zalando embeds its product model as JSON in `CDATA` script blocks.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{scalar, Listing};
use crate::session::Session;

static CDATA_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CDATA\[([\s\S]+?)\]\]>").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct ProductBlock {
    model: Model,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Model {
    display_price: DisplayPrice,
    article_info: ArticleInfo,
}

#[derive(Debug, Deserialize)]
struct DisplayPrice {
    price: PriceValue,
}

#[derive(Debug, Deserialize)]
struct PriceValue {
    value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ArticleInfo {
    units: Vec<Unit>,
}

#[derive(Debug, Deserialize)]
struct Unit {
    size: UnitSize,
    available: bool,
}

#[derive(Debug, Deserialize)]
struct UnitSize {
    local: String,
}

/// The page carries several `CDATA` blocks; the product model is the one
/// that deserializes as such.
fn product_block(url: &str, body: &str) -> Result<Model, ScrapeError> {
    CDATA_BLOCK
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .find_map(|m| serde_json::from_str::<ProductBlock>(m.as_str()).ok())
        .map(|block| block.model)
        .ok_or_else(|| ScrapeError::missing(url, "product model"))
}

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let model = product_block(url, body)?;
    let price =
        scalar(&model.display_price.price.value).ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = model
        .article_info
        .units
        .into_iter()
        .filter(|unit| unit.available)
        .map(|unit| unit.size.local)
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct Zalando;

#[async_trait]
impl RetailerScraper for Zalando {
    fn key(&self) -> &'static str {
        "zalando"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse).await
    }
}
