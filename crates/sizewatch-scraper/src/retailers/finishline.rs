use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{with_header, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{attr, css, first_number, first_text, origin, Listing};
use crate::session::Session;

static PRODUCT_ID: LazyLock<Selector> = LazyLock::new(|| css(r#"div[itemprop="productID"]"#));
static STYLE_ID: LazyLock<Selector> = LazyLock::new(|| css("#productStyleId"));
static COLOR_ID: LazyLock<Selector> = LazyLock::new(|| css("#productColorId"));

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProductIds {
    variant: String,
    style: String,
    color: String,
    price: String,
}

impl ProductIds {
    /// The `style-color` code the size API tags each size with.
    fn style_color(&self) -> String {
        format!("{}-{}", self.style, self.color)
    }
}

#[derive(Debug, Deserialize)]
struct SizesResponse {
    #[serde(rename = "productSizes")]
    product_sizes: Vec<ProductSize>,
}

#[derive(Debug, Deserialize)]
struct ProductSize {
    #[serde(rename = "productId")]
    product_id: String,
    #[serde(rename = "sizeValue")]
    size_value: String,
    #[serde(rename = "sizeClass", default)]
    size_class: String,
}

fn parse_page(url: &str, body: &str) -> Result<ProductIds, ScrapeError> {
    let doc = Html::parse_document(body);
    let variant =
        first_text(&doc, &[&PRODUCT_ID]).ok_or_else(|| ScrapeError::missing(url, "product id"))?;
    let style =
        attr(&doc, &STYLE_ID, "value").ok_or_else(|| ScrapeError::missing(url, "style id"))?;
    let color =
        attr(&doc, &COLOR_ID, "value").ok_or_else(|| ScrapeError::missing(url, "color id"))?;

    let price_selector = Selector::parse(&format!("div#prices_{style}-{color}"))
        .map_err(|e| ScrapeError::extraction(url, "price", format!("{e:?}")))?;
    let price = first_text(&doc, &[&price_selector])
        .as_deref()
        .and_then(first_number)
        .map(ToOwned::to_owned)
        .ok_or_else(|| ScrapeError::missing(url, "price"))?;

    Ok(ProductIds {
        variant,
        style,
        color,
        price,
    })
}

fn available_sizes(ids: &ProductIds, response: SizesResponse) -> Vec<String> {
    let style_color = ids.style_color();
    response
        .product_sizes
        .into_iter()
        .filter(|s| s.product_id == style_color && s.size_class != "unavailable")
        .map(|s| s.size_value)
        .collect()
}

fn sizes_url(page_url: &str, ids: &ProductIds) -> Result<String, ScrapeError> {
    Ok(format!(
        "{}/store/browse/json/productSizesJson.jsp?productId={}&styleId={}&colorId={}",
        origin(page_url)?,
        ids.variant,
        ids.style,
        ids.color
    ))
}

pub struct Finishline;

#[async_trait]
impl RetailerScraper for Finishline {
    fn key(&self) -> &'static str {
        "finishline"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        let url = target.url.as_str();
        let page = session.get(url, &target.headers).await?;
        let ids = parse_page(url, &page.body)?;

        let xhr = with_header(&target.headers, "x-requested-with", "XMLHttpRequest");
        let response: SizesResponse = session.get_json(&sizes_url(url, &ids)?, &xhr).await?;
        let sizes = available_sizes(&ids, response);
        Listing::new(ids.price, sizes).finish(url)
    }
}
