//! New Balance exposes every colourway and size through one Demandware
//! variants endpoint, so the product page itself is never fetched. The
//! colourway comes from the `#color=` fragment of the stored URL.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Deserialize;
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::RetailerScraper;
use crate::error::ScrapeError;
use crate::extract::{capture, origin, scalar, Listing};
use crate::session::Session;

static COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#color=([A-Za-z0-9_ -]+)").expect("valid regex"));

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Variants {
    attribute_values: BTreeMap<String, AttributeValue>,
    variants: Vec<Variant>,
    price_models: BTreeMap<String, PriceModel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeValue {
    #[serde(default)]
    value: String,
    #[serde(default)]
    display_value: String,
}

#[derive(Debug, Deserialize)]
struct Variant {
    attributes: VariantAttributes,
    availability: VariantAvailability,
}

#[derive(Debug, Deserialize)]
struct VariantAttributes {
    color: String,
    size: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantAvailability {
    in_stock: bool,
}

#[derive(Debug, Deserialize)]
struct PriceModel {
    pricing: Pricing,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pricing {
    sales_price: serde_json::Value,
}

/// Product id and colourway from a stored product URL.
fn product_and_color(url: &str) -> Result<(String, String), ScrapeError> {
    let decoded = percent_decode_str(url).decode_utf8_lossy();
    let color = capture(&COLOR_RE, &decoded)
        .map(|c| c.trim().to_owned())
        .ok_or_else(|| ScrapeError::missing(url, "colour"))?;
    let product_id = decoded
        .split(['#', '?'])
        .next()
        .and_then(|path| path.split(".html").next())
        .and_then(|path| path.rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| ScrapeError::missing(url, "product id"))?;
    Ok((product_id, color))
}

fn variants_url(page_url: &str, product_id: &str) -> Result<String, ScrapeError> {
    Ok(format!(
        "{}/on/demandware.store/Sites-newbalance_uk2-Site/en_GB/Product-GetVariants?pid={product_id}",
        origin(page_url)?
    ))
}

fn listing_for_color(url: &str, data: &Variants, color: &str) -> Result<Listing, ScrapeError> {
    let color_code = data
        .attribute_values
        .iter()
        .find(|(_, attr)| attr.value == color)
        .map(|(code, _)| code)
        .ok_or_else(|| ScrapeError::extraction(url, "colour", format!("no colourway {color:?}")))?;

    let sizes = data
        .variants
        .iter()
        .filter(|v| &v.attributes.color == color_code && v.availability.in_stock)
        .filter_map(|v| data.attribute_values.get(&v.attributes.size))
        .filter_map(|size| size.display_value.split(" / ").last())
        .map(ToOwned::to_owned)
        .collect();

    let price = data
        .price_models
        .values()
        .next_back()
        .and_then(|model| scalar(&model.pricing.sales_price))
        .ok_or_else(|| ScrapeError::missing(url, "price"))?;
    Ok(Listing::new(price, sizes))
}

pub struct NewBalance;

#[async_trait]
impl RetailerScraper for NewBalance {
    fn key(&self) -> &'static str {
        "newbalance"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        let url = target.url.as_str();
        let (product_id, color) = product_and_color(url)?;
        let data: Variants = session
            .get_json(&variants_url(url, &product_id)?, &target.headers)
            .await?;
        listing_for_color(url, &data, &color)?.finish(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARIANTS: &str = r#"{
        "attributeValues": {
            "c1": {"value": "Navy", "displayValue": "Navy"},
            "c2": {"value": "Grey", "displayValue": "Grey"},
            "s1": {"value": "070", "displayValue": "US 7.5 / UK 7"},
            "s2": {"value": "080", "displayValue": "US 8.5 / UK 8"},
            "s3": {"value": "090", "displayValue": "US 9.5 / UK 9"}
        },
        "variants": [
            {"attributes": {"color": "c1", "size": "s1"}, "availability": {"inStock": true}},
            {"attributes": {"color": "c1", "size": "s2"}, "availability": {"inStock": false}},
            {"attributes": {"color": "c1", "size": "s3"}, "availability": {"inStock": true}},
            {"attributes": {"color": "c2", "size": "s2"}, "availability": {"inStock": true}}
        ],
        "priceModels": {"M990NV4": {"pricing": {"salesPrice": 164.99}}}
    }"#;

    #[test]
    fn url_yields_product_and_encoded_colour() {
        let (pid, color) =
            product_and_color("https://www.newbalance.co.uk/pd/990v4/M990NV4.html#color=Navy%20Blue")
                .unwrap();
        assert_eq!(pid, "M990NV4");
        assert_eq!(color, "Navy Blue");
    }

    #[test]
    fn url_without_colour_fails() {
        let err = product_and_color("https://www.newbalance.co.uk/pd/990v4/M990NV4.html").unwrap_err();
        assert!(matches!(err, ScrapeError::Extraction { field: "colour", .. }));
    }

    #[test]
    fn sizes_follow_the_selected_colour() {
        let data: Variants = serde_json::from_str(VARIANTS).unwrap();
        let listing = listing_for_color("https://www.newbalance.co.uk/x", &data, "Navy").unwrap();
        assert_eq!(listing.price, "164.99");
        assert_eq!(listing.sizes, vec!["UK 7", "UK 9"]);
    }

    #[test]
    fn unknown_colour_is_an_error() {
        let data: Variants = serde_json::from_str(VARIANTS).unwrap();
        assert!(listing_for_color("https://www.newbalance.co.uk/x", &data, "Red").is_err());
    }

    #[test]
    fn variants_url_is_on_page_origin() {
        assert_eq!(
            variants_url("https://www.newbalance.co.uk/pd/x/M990NV4.html", "M990NV4").unwrap(),
            "https://www.newbalance.co.uk/on/demandware.store/Sites-newbalance_uk2-Site/en_GB/Product-GetVariants?pid=M990NV4"
        );
    }
}
