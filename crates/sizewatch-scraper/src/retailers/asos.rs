use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::RetailerScraper;
use crate::error::ScrapeError;
use crate::extract::{json_after, origin, product_slug, scalar, Listing};
use crate::session::Session;

/// Product state passed to the page's `view('...')` bootstrap call.
#[derive(Debug, Deserialize)]
struct ProductView {
    price: ViewPrice,
    variants: Vec<ViewVariant>,
}

#[derive(Debug, Deserialize)]
struct ViewPrice {
    current: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ViewVariant {
    #[serde(rename = "variantId")]
    variant_id: i64,
    size: String,
}

#[derive(Debug, Deserialize)]
struct StockProduct {
    variants: Vec<StockVariant>,
}

#[derive(Debug, Deserialize)]
struct StockVariant {
    #[serde(rename = "variantId")]
    variant_id: i64,
    #[serde(rename = "isInStock")]
    is_in_stock: bool,
}

fn parse_view(url: &str, body: &str) -> Result<(String, Vec<ViewVariant>), ScrapeError> {
    let view: ProductView = json_after(url, body, "view('", "product view")?;
    let price = scalar(&view.price.current).ok_or_else(|| ScrapeError::missing(url, "price"))?;
    Ok((price, view.variants))
}

fn in_stock_sizes(variants: Vec<ViewVariant>, stock: &[StockProduct]) -> Vec<String> {
    let in_stock: HashSet<i64> = stock
        .iter()
        .flat_map(|p| &p.variants)
        .filter(|v| v.is_in_stock)
        .map(|v| v.variant_id)
        .collect();
    variants
        .into_iter()
        .filter(|v| in_stock.contains(&v.variant_id))
        .map(|v| v.size)
        .collect()
}

fn stock_url(page_url: &str, product_id: &str) -> Result<String, ScrapeError> {
    Ok(format!(
        "{}/api/product/catalogue/v2/stockprice?productIds={product_id}&currency=GBP&store=COM",
        origin(page_url)?
    ))
}

pub struct Asos;

#[async_trait]
impl RetailerScraper for Asos {
    fn key(&self) -> &'static str {
        "asos"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        let url = target.url.as_str();
        let product_id = product_slug(url).ok_or_else(|| ScrapeError::missing(url, "product id"))?;
        let page = session.get(url, &target.headers).await?;
        let (price, variants) = parse_view(url, &page.body)?;

        let stock: Vec<StockProduct> = session
            .get_json(&stock_url(url, &product_id)?, &target.headers)
            .await?;
        Listing::new(price, in_stock_sizes(variants, &stock)).finish(url)
    }
}
