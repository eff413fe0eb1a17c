use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{capture, js_object, meta_content, Listing};
use crate::session::Session;

static PDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var pData = (.*);").expect("valid regex"));
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d.]*\d").expect("valid regex"));

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProductData {
    rep_color_code: String,
    variants: Vec<ColorVariant>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ColorVariant {
    color_id: String,
    sizes: Vec<SizeOption>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SizeOption {
    size_name: String,
    available: bool,
}

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    // The description ends with the price, e.g. "... Shop now for $24.90".
    let price = {
        let doc = Html::parse_document(body);
        meta_content(&doc, "description")
            .and_then(|d| NUMBER_RE.find_iter(&d).last().map(|m| m.as_str().to_owned()))
            .ok_or_else(|| ScrapeError::missing(url, "price"))?
    };

    let raw = capture(&PDATA_RE, body).ok_or_else(|| ScrapeError::missing(url, "product data"))?;
    let data: ProductData = js_object(raw, &format!("product data on {url}"))?;
    let variant = data
        .variants
        .into_iter()
        .find(|v| v.color_id == data.rep_color_code)
        .ok_or_else(|| ScrapeError::missing(url, "selected colour"))?;

    let sizes = variant
        .sizes
        .into_iter()
        .filter(|s| s.available)
        .map(|s| s.size_name)
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct Forever21;

#[async_trait]
impl RetailerScraper for Forever21 {
    fn key(&self) -> &'static str {
        "forever21"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.forever21.com/us/shop/catalog/product/21men/mens-shoes/2000262398";

    #[test]
    fn sizes_come_from_the_representative_colour() {
        let body = r#"<head><meta name="description" content="Faux leather sneakers in 2 colours. Shop now for $24.90."></head>
            <script>var pData = {'RepColorCode': '01', 'Variants': [{'ColorId': '02', 'Sizes': [{'SizeName': '9', 'Available': true}]}, {'ColorId': '01', 'Sizes': [{'SizeName': '8', 'Available': true}, {'SizeName': '9', 'Available': false}, {'SizeName': '10', 'Available': true}]}]};</script>"#;
        let listing = parse(URL, body).unwrap();
        assert_eq!(listing.price, "24.90");
        assert_eq!(listing.sizes, vec!["8", "10"]);
    }

    #[test]
    fn unknown_colour_fails() {
        let body = r#"<meta name="description" content="Sneakers $24.90">
            <script>var pData = {"RepColorCode": "07", "Variants": []};</script>"#;
        let err = parse(URL, body).unwrap_err();
        assert!(matches!(err, ScrapeError::Extraction { field: "selected colour", .. }));
    }
}
