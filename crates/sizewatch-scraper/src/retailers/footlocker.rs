//! Foot Locker and Lady Foot Locker.
//!
//! The US storefronts render the size grid in the page. The UK store only
//! renders the price; sizes come from the Intershop variation endpoint as an
//! HTML fragment wrapped in JSON.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{with_header, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, first_text, meta_content, origin, text, Listing};
use crate::session::Session;

/// Both storefronts answer other agents with a bot-check page.
const STOREFRONT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/71.0.3578.98 Safari/537.36";

/// Sold-out tiles carry an extra modifier class, so only the exact class
/// list marks a purchasable size.
static SIZE_TILES: LazyLock<Selector> =
    LazyLock::new(|| css(r#"div[class="c-form-field c-form-field--radio custom c-size"]"#));
static US_PRICE: LazyLock<Selector> = LazyLock::new(|| css("div.list span"));
static FINAL_PRICE: LazyLock<Selector> = LazyLock::new(|| css("span.final"));
static PRODUCT_PRICE: LazyLock<Selector> =
    LazyLock::new(|| css(r#"div[class="c-product-price"] span"#));

static SIZE_BLOCKS: LazyLock<Selector> = LazyLock::new(|| css("div.fl-product-size"));
static SIZE_BUTTONS: LazyLock<Selector> =
    LazyLock::new(|| css(r#"button[class="fl-product-size--item"]"#));
static BASE_SKU: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{12}").expect("valid regex"));

/// The UK fragment lists EU, US and UK sizes; the third block is UK.
const UK_SIZE_BLOCK: usize = 2;

#[derive(Debug, Deserialize)]
struct VariationSelect {
    content: String,
}

fn storefront_headers(headers: &[(String, String)]) -> Vec<(String, String)> {
    with_header(headers, "user-agent", STOREFRONT_USER_AGENT)
}

fn is_uk_store(url: &str) -> bool {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.ends_with(".co.uk")))
        .unwrap_or(false)
}

fn parse_size_grid(
    url: &str,
    body: &str,
    price_selectors: &[&Selector],
) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price =
        first_text(&doc, price_selectors).ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = doc.select(&SIZE_TILES).map(text).collect();
    Ok(Listing::new(price, sizes))
}

fn parse_us(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    parse_size_grid(url, body, &[&US_PRICE])
}

fn parse_lady(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    parse_size_grid(url, body, &[&FINAL_PRICE, &PRODUCT_PRICE])
}

/// UK prices use a decimal comma, e.g. `"129,99"`.
fn parse_uk_price(url: &str, body: &str) -> Result<String, ScrapeError> {
    let doc = Html::parse_document(body);
    meta_content(&doc, "price")
        .map(|p| p.replace(',', "."))
        .ok_or_else(|| ScrapeError::missing(url, "price"))
}

fn parse_uk_sizes(url: &str, fragment: &str) -> Result<Vec<String>, ScrapeError> {
    let doc = Html::parse_fragment(fragment);
    let block = doc
        .select(&SIZE_BLOCKS)
        .nth(UK_SIZE_BLOCK)
        .ok_or_else(|| ScrapeError::missing(url, "UK size block"))?;
    Ok(block.select(&SIZE_BUTTONS).map(text).collect())
}

fn variation_url(page_url: &str) -> Result<String, ScrapeError> {
    let sku = BASE_SKU
        .find(page_url)
        .ok_or_else(|| ScrapeError::missing(page_url, "base sku"))?;
    Ok(format!(
        "{}/INTERSHOP/web/WFS/Footlocker-Footlocker_GB-Site/en_GB/-/GBP/ViewProduct-ProductVariationSelect?BaseSKU={}&InventoryServerity=ProductDetail",
        origin(page_url)?,
        sku.as_str()
    ))
}

pub struct Footlocker;

#[async_trait]
impl RetailerScraper for Footlocker {
    fn key(&self) -> &'static str {
        "footlocker"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        let url = target.url.as_str();
        let headers = storefront_headers(&target.headers);
        let page = session.get(url, &headers).await?;

        if !is_uk_store(url) {
            return parse_us(url, &page.body)?.finish(url);
        }

        let price = parse_uk_price(url, &page.body)?;
        let variations: VariationSelect = session.get_json(&variation_url(url)?, &headers).await?;
        Listing::new(price, parse_uk_sizes(url, &variations.content)?).finish(url)
    }
}

pub struct LadyFootlocker;

#[async_trait]
impl RetailerScraper for LadyFootlocker {
    fn key(&self) -> &'static str {
        "ladyfootlocker"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        let url = target.url.as_str();
        let page = session.get(url, &storefront_headers(&target.headers)).await?;
        parse_lady(url, &page.body)?.finish(url)
    }
}
