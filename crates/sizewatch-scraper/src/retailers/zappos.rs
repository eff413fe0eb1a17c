//! Zappos: the product and colour ids are in the URL path; price and stock
//! come from the product bundle API.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::RetailerScraper;
use crate::error::ScrapeError;
use crate::extract::{scalar, Listing};
use crate::session::Session;

const BUNDLE_API: &str = "https://api.zcloudcat.com/v3/productBundle";

static PATH_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/(\d+)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProductIds {
    product: String,
    color: String,
}

#[derive(Debug, Deserialize)]
struct Bundle {
    product: Vec<Product>,
}

#[derive(Debug, Deserialize)]
struct Product {
    styles: Vec<Style>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Style {
    color_id: String,
    price: serde_json::Value,
    #[serde(default)]
    stocks: Vec<Stock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stock {
    size: String,
    #[serde(default)]
    on_hand: Option<String>,
}

impl Stock {
    fn in_stock(&self) -> bool {
        !matches!(self.on_hand.as_deref().map(str::trim), Some("0"))
    }
}

/// `/p/{slug}/product/{product}/color/{color}`.
fn product_ids(url: &str) -> Result<ProductIds, ScrapeError> {
    let mut numbers = PATH_NUMBER
        .captures_iter(url)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_owned()));
    let product = numbers
        .next()
        .ok_or_else(|| ScrapeError::missing(url, "product id"))?;
    let color = numbers
        .next()
        .ok_or_else(|| ScrapeError::missing(url, "colour id"))?;
    Ok(ProductIds { product, color })
}

fn bundle_url(ids: &ProductIds) -> String {
    format!("{BUNDLE_API}?productId={}&siteId=1", ids.product)
}

fn listing_for_colour(url: &str, ids: &ProductIds, bundle: Bundle) -> Result<Listing, ScrapeError> {
    let style = bundle
        .product
        .into_iter()
        .next()
        .and_then(|p| p.styles.into_iter().find(|s| s.color_id == ids.color))
        .ok_or_else(|| ScrapeError::missing(url, "colour style"))?;
    let price = scalar(&style.price).ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = style
        .stocks
        .into_iter()
        .filter(Stock::in_stock)
        .map(|s| s.size)
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct Zappos;

#[async_trait]
impl RetailerScraper for Zappos {
    fn key(&self) -> &'static str {
        "zappos"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        let url = target.url.as_str();
        let ids = product_ids(url)?;
        // A delisted product 404s here before the API is asked.
        session.get(url, &target.headers).await?;
        let bundle: Bundle = session.get_json(&bundle_url(&ids), &target.headers).await?;
        listing_for_colour(url, &ids, bundle)?.finish(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.zappos.com/p/nike-air-max-axis-black-anthracite/product/9011448/color/3897";

    const BUNDLE: &str = r#"{"product":[{"styles":[
        {"colorId":"151","price":"$90.00","stocks":[{"size":"12","onHand":"3"}]},
        {"colorId":"3897","price":"$79.99","stocks":[
            {"size":"8","onHand":"2"},
            {"size":"8.5","onHand":"0"},
            {"size":"10"}
        ]}
    ]}]}"#;

    #[test]
    fn ids_come_from_the_path() {
        let ids = product_ids(URL).unwrap();
        assert_eq!(ids.product, "9011448");
        assert_eq!(ids.color, "3897");
        assert_eq!(
            bundle_url(&ids),
            "https://api.zcloudcat.com/v3/productBundle?productId=9011448&siteId=1"
        );
    }

    #[test]
    fn selected_colour_keeps_stocked_sizes() {
        let ids = product_ids(URL).unwrap();
        let bundle: Bundle = serde_json::from_str(BUNDLE).unwrap();
        let listing = listing_for_colour(URL, &ids, bundle).unwrap();
        assert_eq!(listing.price, "$79.99");
        assert_eq!(listing.sizes, vec!["8", "10"]);
    }

    #[test]
    fn unknown_colour_fails() {
        let ids = ProductIds {
            product: "9011448".to_owned(),
            color: "1".to_owned(),
        };
        let bundle: Bundle = serde_json::from_str(BUNDLE).unwrap();
        assert!(matches!(
            listing_for_colour(URL, &ids, bundle),
            Err(ScrapeError::Extraction { field: "colour style", .. })
        ));
    }
}
