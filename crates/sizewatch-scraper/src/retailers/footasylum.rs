//! Footasylum and Drome run the same platform: every colourway's variants
//! sit in one single-quoted `variants` object keyed by SKU.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{capture, css, first_text, js_object, scalar, Listing};
use crate::session::Session;

static FOOTASYLUM_VARIANTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"variants = (\{.+\} \})").expect("valid regex"));
static DROME_VARIANTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"variants : (\{".*\}\})"#).expect("valid regex"));
static DROME_PF_ID: LazyLock<Selector> = LazyLock::new(|| css("span#prod_pfId"));
static DROME_PRICE: LazyLock<Selector> = LazyLock::new(|| css(r#"span[itemprop="price"]"#));

#[derive(Debug, Deserialize)]
struct Variant {
    pf_id: serde_json::Value,
    option2: serde_json::Value,
    #[serde(default)]
    stock_status: String,
    #[serde(default)]
    price: String,
}

impl Variant {
    fn belongs_to(&self, pf_id: &str) -> bool {
        scalar(&self.pf_id).is_some_and(|id| id == pf_id)
    }

    fn in_stock(&self) -> bool {
        self.stock_status == "in stock"
    }
}

fn parse_variants(
    url: &str,
    body: &str,
    re: &Regex,
) -> Result<BTreeMap<String, Variant>, ScrapeError> {
    let raw = capture(re, body).ok_or_else(|| ScrapeError::missing(url, "variants"))?;
    js_object(raw, &format!("variants on {url}"))
}

fn in_stock_sizes(variants: &BTreeMap<String, Variant>, pf_id: &str) -> Vec<String> {
    variants
        .values()
        .filter(|v| v.belongs_to(pf_id) && v.in_stock())
        .filter_map(|v| scalar(&v.option2))
        .collect()
}

/// Product family id: the last `-` separated part of the URL path.
fn footasylum_pf_id(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('-')
        .next()
        .filter(|id| !id.is_empty() && !id.contains('/'))
        .map(ToOwned::to_owned)
}

fn parse_footasylum(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let pf_id = footasylum_pf_id(url).ok_or_else(|| ScrapeError::missing(url, "product id"))?;
    let variants = parse_variants(url, body, &FOOTASYLUM_VARIANTS_RE)?;

    // Prices are rendered as "&pound;110.00"; prefer an in-stock variant's.
    let price = variants
        .values()
        .filter(|v| v.belongs_to(&pf_id))
        .max_by_key(|v| v.in_stock())
        .and_then(|v| v.price.split(';').nth(1))
        .map(ToOwned::to_owned)
        .ok_or_else(|| ScrapeError::missing(url, "price"))?;

    Ok(Listing::new(price, in_stock_sizes(&variants, &pf_id)))
}

fn parse_drome(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let (pf_id, price) = {
        let doc = Html::parse_document(body);
        let pf_id = first_text(&doc, &[&DROME_PF_ID])
            .ok_or_else(|| ScrapeError::missing(url, "product id"))?;
        let price =
            first_text(&doc, &[&DROME_PRICE]).ok_or_else(|| ScrapeError::missing(url, "price"))?;
        (pf_id, price)
    };
    let variants = parse_variants(url, body, &DROME_VARIANTS_RE)?;
    Ok(Listing::new(price, in_stock_sizes(&variants, &pf_id)))
}

pub struct Footasylum;

#[async_trait]
impl RetailerScraper for Footasylum {
    fn key(&self) -> &'static str {
        "footasylum"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse_footasylum).await
    }
}

pub struct Drome;

#[async_trait]
impl RetailerScraper for Drome {
    fn key(&self) -> &'static str {
        "drome"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse_drome).await
    }
}
