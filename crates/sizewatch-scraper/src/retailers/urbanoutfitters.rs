use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, has_class, meta_content, Listing};
use crate::session::Session;

static SIZE_ITEMS: LazyLock<Selector> =
    LazyLock::new(|| css("fieldset.c-product-sizes__field-set li"));
static INPUT: LazyLock<Selector> = LazyLock::new(|| css("input"));

fn parse(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price = meta_content(&doc, "product:price:amount")
        .ok_or_else(|| ScrapeError::missing(url, "price"))?;
    let sizes = doc
        .select(&SIZE_ITEMS)
        .filter(|item| !has_class(*item, "is-disabled"))
        .filter_map(|item| item.select(&INPUT).next()?.value().attr("value"))
        .map(ToOwned::to_owned)
        .collect();
    Ok(Listing::new(price, sizes))
}

pub struct UrbanOutfitters;

#[async_trait]
impl RetailerScraper for UrbanOutfitters {
    fn key(&self) -> &'static str {
        "urbanoutfitters"
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
    fn disabled_items_are_skipped() {
        let body = r#"<meta property="product:price:amount" content="65.00">
            <fieldset class="c-product-sizes__field-set"><ul>
                <li class="c-product-sizes__item"><input type="radio" value="UK 6"></li>
                <li class="c-product-sizes__item is-disabled"><input type="radio" value="UK 7"></li>
                <li class="c-product-sizes__item"><input type="radio" value="UK 8"></li>
            </ul></fieldset>"#;
        let listing = parse("https://www.urbanoutfitters.com/en-gb/shop/x", body).unwrap();
        assert_eq!(listing.price, "65.00");
        assert_eq!(listing.sizes, vec!["UK 6", "UK 8"]);
    }
}
