use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, first_text, text, Listing};
use crate::session::Session;

static SIZE_OPTIONS: LazyLock<Selector> = LazyLock::new(|| css("option[data-stock]"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| css(r#"span[itemprop="price"]"#));
/// Stock notes trail the size label, e.g. `"UK 9 - Only one left"`.
static TRAILING_NOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Z0-9.]+$").expect("valid regex"));

fn size_label(option_text: &str) -> String {
    let stripped = TRAILING_NOTE.replace(option_text, "");
    stripped.split('-').next().unwrap_or_default().trim().to_owned()
}

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price = first_text(&doc, &[&PRICE]).ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = doc
        .select(&SIZE_OPTIONS)
        .map(text)
        .filter(|t| !t.contains("Sold out"))
        .map(|t| size_label(&t))
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct MrPorter;

#[async_trait]
impl RetailerScraper for MrPorter {
    fn key(&self) -> &'static str {
        "mrporter"
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

    #[test]
    fn sold_out_options_are_dropped() {
        let body = r#"<span itemprop="price">&pound;120</span>
            <select>
                <option>Select a size</option>
                <option data-stock="Low_Stock">UK 8 - Only one left</option>
                <option data-stock="Out_of_Stock">UK 8.5 - Sold out</option>
                <option data-stock="In_Stock">UK 9</option>
            </select>"#;
        let listing = parse("https://www.mrporter.com/en-gb/mens/x/1127550", body).unwrap();
        assert_eq!(listing.price, "£120");
        assert_eq!(listing.sizes, vec!["UK 8", "UK 9"]);
    }

    #[test]
    fn size_label_trims_stock_notes() {
        assert_eq!(size_label("UK 10 - Only 2 left in stock"), "UK 10");
        assert_eq!(size_label("XL"), "XL");
    }

    #[test]
    fn missing_price_fails() {
        assert!(parse("https://www.mrporter.com/x", "<select></select>").is_err());
    }
}
