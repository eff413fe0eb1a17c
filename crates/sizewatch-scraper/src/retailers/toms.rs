use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, first_text, text, Listing};
use crate::session::Session;

static REGULAR_PRICE: LazyLock<Selector> = LazyLock::new(|| css("span.regPrice"));
static SALE_PRICE: LazyLock<Selector> = LazyLock::new(|| css("span.salePrice"));
static SIZE_LINKS: LazyLock<Selector> = LazyLock::new(|| css(r#"li[role="option"] a"#));

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price = first_text(&doc, &[&REGULAR_PRICE, &SALE_PRICE])
        .ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = doc
        .select(&SIZE_LINKS)
        .map(text)
        .filter(|t| !t.contains("Currently out of stock"))
        .map(|t| t.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect::<String>())
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct Toms;

#[async_trait]
impl RetailerScraper for Toms {
    fn key(&self) -> &'static str {
        "toms"
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
    fn sale_price_is_the_fallback() {
        let body = r#"<span class="salePrice">$49.99</span>
            <ul>
                <li role="option"><a>Size 8</a></li>
                <li role="option"><a>Size 9 Currently out of stock</a></li>
                <li role="option"><a>Size 10.5</a></li>
            </ul>"#;
        let listing = parse("https://www.toms.com/men/cabrillo", body).unwrap();
        assert_eq!(listing.price, "$49.99");
        assert_eq!(listing.sizes, vec!["8", "10.5"]);
    }
}
