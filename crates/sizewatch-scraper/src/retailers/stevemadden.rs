use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, has_class, meta_content, text, Listing};
use crate::session::Session;

static SWATCHES: LazyLock<Selector> =
    LazyLock::new(|| css(r#"div[class="swatch clearfix select_size"] div"#));

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price =
        meta_content(&doc, "og:price:amount").ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = doc
        .select(&SWATCHES)
        .skip(1)
        .filter(|swatch| has_class(*swatch, "available"))
        .map(text)
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct SteveMadden;

#[async_trait]
impl RetailerScraper for SteveMadden {
    fn key(&self) -> &'static str {
        "stevemadden"
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
    fn keeps_available_swatches_after_the_header() {
        let body = r#"<meta property="og:price:amount" content="89.95">
            <div class="swatch clearfix select_size">
                <div class="header available">Size</div>
                <div class="swatch-element available">7</div>
                <div class="swatch-element soldout">7.5</div>
                <div class="swatch-element available"> 8 </div>
            </div>"#;
        let listing = parse(
            "https://www.stevemadden.com/collections/mens-sneakers/products/raving-red",
            body,
        )
        .unwrap();
        assert_eq!(listing.price, "89.95");
        assert_eq!(listing.sizes, vec!["7", "8"]);
    }
}
