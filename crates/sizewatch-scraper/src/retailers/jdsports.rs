//! JD Sports, size? and Footpatrol share one storefront. Sizes are buttons
//! under `#productSizeStock`; sold-out sizes are disabled or carry the
//! `noStock` class.

use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use super::{scrape_page, RetailerScraper};
use crate::error::ScrapeError;
use crate::extract::{css, first_number, has_class, meta_content, text, Listing};
use crate::session::Session;

static SIZE_BUTTONS: LazyLock<Selector> = LazyLock::new(|| css("div#productSizeStock button"));

fn purchasable(button: ElementRef<'_>) -> bool {
    button.value().attr("disabled").is_none() && !has_class(button, "noStock")
}

fn size_buttons(doc: &Html) -> Vec<ElementRef<'_>> {
    doc.select(&SIZE_BUTTONS).collect()
}

fn in_stock_sizes(buttons: &[ElementRef<'_>]) -> Vec<String> {
    buttons
        .iter()
        .copied()
        .filter(|b| purchasable(*b))
        .filter_map(|b| first_number(&text(b)).map(ToOwned::to_owned))
        .collect()
}

fn parse_storefront(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let price = meta_content(&doc, "price").ok_or_else(|| ScrapeError::missing(url, "price"))?;
    Ok(Listing::new(price, in_stock_sizes(&size_buttons(&doc))))
}

/// The `/stock/` fragment: buttons only, each carrying `data-price`.
fn parse_stock_fragment(url: &str, body: &str) -> Result<Listing, ScrapeError> {
    let doc = Html::parse_document(body);
    let buttons = size_buttons(&doc);
    let price = buttons
        .iter()
        .find_map(|b| b.value().attr("data-price"))
        .and_then(first_number)
        .map(ToOwned::to_owned)
        .ok_or_else(|| ScrapeError::missing(url, "price"))?;
    Ok(Listing::new(price, in_stock_sizes(&buttons)))
}

fn stock_url(url: &str) -> String {
    let base = url.split(['?', '#']).next().unwrap_or(url);
    format!("{}/stock/", base.trim_end_matches('/'))
}

pub struct JdSports;

#[async_trait]
impl RetailerScraper for JdSports {
    fn key(&self) -> &'static str {
        "jdsports"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse_storefront).await
    }
}

pub struct Size;

#[async_trait]
impl RetailerScraper for Size {
    fn key(&self) -> &'static str {
        "size"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        scrape_page(session, &target.url, &target.headers, parse_storefront).await
    }
}

pub struct Footpatrol;

#[async_trait]
impl RetailerScraper for Footpatrol {
    fn key(&self) -> &'static str {
        "footpatrol"
    }

    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        let url = stock_url(&target.url);
        let page = session.get(&url, &target.headers).await?;
        parse_stock_fragment(&url, &page.body)?.finish(&target.url)
    }
}
