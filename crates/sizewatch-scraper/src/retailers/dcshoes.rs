use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, first_text, text, Listing};
use crate::session::Session;

static PRICE: LazyLock<Selector> = LazyLock::new(|| css("div.salesprice"));
/// Unselectable swatches carry an extra class.
static SWATCHES: LazyLock<Selector> =
    LazyLock::new(|| css(r#"li[class="variations-box-variation emptyswatch"]"#));

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price = first_text(&doc, &[&PRICE]).ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = doc.select(&SWATCHES).map(text).collect();
    Ok(Listing::new(price, sizes))
}

pub struct DcShoes;

#[async_trait]
impl RetailerScraper for DcShoes {
    fn key(&self) -> &'static str {
        "dcshoes"
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
    fn unselectable_swatches_are_dropped() {
        let body = r#"<div class="salesprice">$65.00</div>
            <ul>
                <li class="variations-box-variation emptyswatch"> 8 </li>
                <li class="variations-box-variation unselectable emptyswatch">9</li>
                <li class="variations-box-variation emptyswatch">10</li>
            </ul>"#;
        let listing = parse("https://www.dcshoes.com/manteca-shoes-ADYS100177.html", body).unwrap();
        assert_eq!(listing.price, "$65.00");
        assert_eq!(listing.sizes, vec!["8", "10"]);
    }
}
