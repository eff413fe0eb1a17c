//! Magento storefronts (END. Clothing, Consortium). Both embed the
//! configurable-product JSON in the page; an option with no linked
//! simple products is sold out.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{json_after, scalar, Listing};
use crate::session::Session;

/// Attribute id of the size attribute on END.
const END_SIZE_ATTRIBUTE: &str = "173";
const CONSORTIUM_SIZE_ATTRIBUTE: &str = "502";

#[derive(Debug, Deserialize)]
struct Attribute {
    #[serde(default)]
    options: Vec<AttributeOption>,
}

#[derive(Debug, Deserialize)]
struct AttributeOption {
    label: String,
    #[serde(default)]
    products: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct EndConfig {
    attributes: HashMap<String, Attribute>,
    prices: EndPrices,
}

#[derive(Debug, Deserialize)]
struct EndPrices {
    #[serde(rename = "finalPrice")]
    final_price: EndAmount,
}

#[derive(Debug, Deserialize)]
struct EndAmount {
    amount: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ConsortiumConfig {
    attributes: HashMap<String, Attribute>,
    #[serde(rename = "basePrice")]
    base_price: serde_json::Value,
}

fn in_stock_labels(
    url: &str,
    mut attributes: HashMap<String, Attribute>,
    size_attribute: &str,
) -> Result<Vec<String>, ScrapeError> {
    let sizes = attributes
        .remove(size_attribute)
        .ok_or_else(|| ScrapeError::missing(url, "size attribute"))?;
    Ok(sizes
        .options
        .into_iter()
        .filter(|o| !o.products.is_empty())
        .map(|o| o.label)
        .collect())
}

fn parse_end(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let config: EndConfig = json_after(url, body, "\"spConfig\":", "product config")?;
    let price =
        scalar(&config.prices.final_price.amount).ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = in_stock_labels(url, config.attributes, END_SIZE_ATTRIBUTE)?;
    Ok(Listing::new(price, sizes))
}

fn parse_consortium(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let config: ConsortiumConfig = json_after(url, body, "ConfigDefaultText(", "product config")?;
    let price = scalar(&config.base_price).ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = in_stock_labels(url, config.attributes, CONSORTIUM_SIZE_ATTRIBUTE)?;
    Ok(Listing::new(price, sizes))
}

pub struct EndClothing;

#[async_trait]
impl RetailerScraper for EndClothing {
    fn key(&self) -> &'static str {
        "endclothing"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse_end).await
    }
}

pub struct Consortium;

#[async_trait]
impl RetailerScraper for Consortium {
    fn key(&self) -> &'static str {
        "consortium"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse_consortium).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const END_PAGE: &str = r#"<script type="text/x-magento-init">
        {"[data-role=swatch-options]": {"configurable": {"spConfig": {
            "attributes": {"173": {"id": "173", "code": "size", "options": [
                {"id": "1", "label": "UK 7", "products": ["5001"]},
                {"id": "2", "label": "UK 8", "products": []},
                {"id": "3", "label": "UK 9", "products": ["5003"]}
            ]}},
            "prices": {"oldPrice": {"amount": "130"}, "finalPrice": {"amount": "110"}}
        }, "gallerySwitchStrategy": "replace"}}}
    </script>"#;

    const CONSORTIUM_PAGE: &str = r#"<script>
        var spConfig = new Product.ConfigDefaultText({"attributes":{"502":{"id":"502","options":[
            {"id":"10","label":"8","products":["77"]},
            {"id":"11","label":"8.5","products":[]},
            {"id":"12","label":"10","products":["79","80"]}
        ]}},"basePrice":"95.00","chooseText":"Choose an Option..."});
    </script>"#;

    #[test]
    fn end_keeps_options_with_products() {
        let listing = parse_end("https://www.endclothing.com/gb/x.html", END_PAGE).unwrap();
        assert_eq!(listing.price, "110");
        assert_eq!(listing.sizes, vec!["UK 7", "UK 9"]);
    }

    #[test]
    fn end_without_size_attribute_fails() {
        let page = END_PAGE.replace("\"173\"", "\"999\"");
        let err = parse_end("https://www.endclothing.com/gb/x.html", &page).unwrap_err();
        assert!(matches!(err, ScrapeError::Extraction { field: "size attribute", .. }));
    }

    #[test]
    fn consortium_reads_base_price_and_options() {
        let listing = parse_consortium("https://www.consortium.co.uk/x.html", CONSORTIUM_PAGE).unwrap();
        assert_eq!(listing.price, "95.00");
        assert_eq!(listing.sizes, vec!["8", "10"]);
    }

    #[test]
    fn consortium_without_config_fails() {
        assert!(parse_consortium("https://www.consortium.co.uk/x.html", "<html></html>").is_err());
    }
}
