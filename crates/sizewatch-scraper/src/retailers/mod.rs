//! One [`RetailerScraper`] per supported retailer.
//!
//! Each parser works on the fetched body synchronously and hands back raw
//! strings; the async `scrape` only sequences fetches. Every parser returns
//! sizes for purchasable options only and fails rather than returning a
//! partial listing.

mod academy;
mod adidas;
mod asos;
mod dcshoes;
mod eastbay;
mod finishline;
mod footasylum;
mod footlocker;
mod forever21;
mod jdsports;
mod magento;
mod mrporter;
mod newbalance;
mod nike;
mod nordstromrack;
mod offspring;
mod roadrunnersports;
mod schuh;
mod spartoo;
mod sportsdirect;
mod stevemadden;
mod toms;
mod urbanindustry;
mod urbanoutfitters;
mod vans;
mod zalando;
mod zappos;

use std::sync::Arc;

use async_trait::async_trait;
use sizewatch_core::{ScrapeResult, ScrapeTarget};

use crate::error::ScrapeError;
use crate::extract::Listing;
use crate::session::Session;

pub use academy::Academy;
pub use adidas::{Adidas, Reebok};
pub use asos::Asos;
pub use dcshoes::DcShoes;
pub use eastbay::Eastbay;
pub use finishline::Finishline;
pub use footasylum::{Drome, Footasylum};
pub use footlocker::{Footlocker, LadyFootlocker};
pub use forever21::Forever21;
pub use jdsports::{Footpatrol, JdSports, Size};
pub use magento::{Consortium, EndClothing};
pub use mrporter::MrPorter;
pub use newbalance::NewBalance;
pub use nike::Nike;
pub use nordstromrack::NordstromRack;
pub use offspring::Offspring;
pub use roadrunnersports::RoadRunnerSports;
pub use schuh::Schuh;
pub use spartoo::Spartoo;
pub use sportsdirect::SportsDirect;
pub use stevemadden::SteveMadden;
pub use toms::Toms;
pub use urbanindustry::UrbanIndustry;
pub use urbanoutfitters::UrbanOutfitters;
pub use vans::Vans;
pub use zalando::Zalando;
pub use zappos::Zappos;

#[async_trait]
pub trait RetailerScraper: Send + Sync {
    /// Dispatch key this scraper is registered under, e.g. `"sportsdirect"`.
    fn key(&self) -> &'static str;

    /// Scrapes current price and purchasable sizes from `target.url`.
    async fn scrape(
        &self,
        session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError>;
}

/// Every built-in retailer scraper.
#[must_use]
pub fn all() -> Vec<Arc<dyn RetailerScraper>> {
    vec![
        Arc::new(Academy),
        Arc::new(Adidas),
        Arc::new(Asos),
        Arc::new(Consortium),
        Arc::new(DcShoes),
        Arc::new(Drome),
        Arc::new(Eastbay),
        Arc::new(EndClothing),
        Arc::new(Finishline),
        Arc::new(Footasylum),
        Arc::new(Footlocker),
        Arc::new(Footpatrol),
        Arc::new(Forever21),
        Arc::new(JdSports),
        Arc::new(LadyFootlocker),
        Arc::new(MrPorter),
        Arc::new(NewBalance),
        Arc::new(Nike),
        Arc::new(NordstromRack),
        Arc::new(Offspring),
        Arc::new(Reebok),
        Arc::new(RoadRunnerSports),
        Arc::new(Schuh),
        Arc::new(Size),
        Arc::new(Spartoo),
        Arc::new(SportsDirect),
        Arc::new(SteveMadden),
        Arc::new(Toms),
        Arc::new(UrbanIndustry),
        Arc::new(UrbanOutfitters),
        Arc::new(Vans),
        Arc::new(Zalando),
        Arc::new(Zappos),
    ]
}

/// Fetches `url` and runs a single-page parser over it.
async fn scrape_page(
    session: &Session,
    url: &str,
    headers: &[(String, String)],
    parse: fn(&str, &str) -> Result<Listing, ScrapeError>,
) -> Result<ScrapeResult, ScrapeError> {
    let page = session.get(url, headers).await?;
    parse(url, &page.body)?.finish(url)
}

/// `headers` followed by one extra pair.
fn with_header(headers: &[(String, String)], name: &str, value: &str) -> Vec<(String, String)> {
    let mut out = headers.to_vec();
    out.push((name.to_owned(), value.to_owned()));
    out
}
