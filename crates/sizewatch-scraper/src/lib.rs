//! On-demand price and size scraping for retailer product pages.
//!
//! A [`Refresher`] resolves a supplier record's retailer through the
//! [`Registry`], runs the retailer's scraper over a [`Session`] and writes
//! the normalized [`sizewatch_core::ScrapeResult`] back to the store.

pub mod error;
pub(crate) mod extract;
pub mod fetch;
pub mod normalize;
pub mod proxy;
pub mod refresh;
pub mod registry;
pub mod retailers;
pub mod session;

pub use error::{FetchError, NormalizeError, ScrapeError};
pub use fetch::{FetchConfig, FetchOutcome, Fetcher, Page};
pub use normalize::{clean_price, clean_sizes, SizeRules};
pub use proxy::{PoolSettings, ProxyMode, ProxyPool};
pub use refresh::{BatchPolicy, BatchReport, RecordFailure, RefreshError, RefreshOutcome, Refresher};
pub use registry::{dispatch_key, Dispatch, Registry};
pub use retailers::RetailerScraper;
pub use session::Session;
