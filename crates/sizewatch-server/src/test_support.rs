//! Fake retailers and in-memory wiring shared by the route and job tests.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sizewatch_core::{
    AppConfig, BatchPolicy, Environment, MemoryProxyStore, MemorySupplierStore, ProxyMode,
    ScrapeResult, ScrapeTarget, SupplierRecord,
};
use sizewatch_scraper::{
    FetchConfig, Fetcher, PoolSettings, ProxyPool, Refresher, Registry, RetailerScraper,
    ScrapeError, Session,
};

pub(crate) struct FixedListing;

#[async_trait]
impl RetailerScraper for FixedListing {
    fn key(&self) -> &'static str {
        "goodshop"
    }

    async fn scrape(
        &self,
        _session: &Session,
        _target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        Ok(ScrapeResult::new(
            Decimal::new(4500, 2),
            vec!["9".to_owned(), "8".to_owned()],
        ))
    }
}

pub(crate) struct BrokenMarkup;

#[async_trait]
impl RetailerScraper for BrokenMarkup {
    fn key(&self) -> &'static str {
        "brokenshop"
    }

    async fn scrape(
        &self,
        _session: &Session,
        target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        Err(ScrapeError::Extraction {
            url: target.url.clone(),
            field: "price",
            reason: "not present on page".to_owned(),
        })
    }
}

pub(crate) struct NoProxies;

#[async_trait]
impl RetailerScraper for NoProxies {
    fn key(&self) -> &'static str {
        "proxiedshop"
    }

    async fn scrape(
        &self,
        _session: &Session,
        _target: &ScrapeTarget,
    ) -> Result<ScrapeResult, ScrapeError> {
        Err(ScrapeError::PoolExhausted { max_fails: 5 })
    }
}

/// A supplier record for product 7 last scraped a day ago.
pub(crate) fn stale_record(id: i64, retailer: &str) -> SupplierRecord {
    SupplierRecord {
        id,
        product_id: 7,
        retailer_name: retailer.to_owned(),
        url: format!("https://shop.test/p/{id}"),
        price: Some(Decimal::new(5000, 2)),
        sizes: vec!["10".to_owned()],
        last_scraped: Utc::now() - Duration::days(1),
    }
}

pub(crate) fn fresh_record(id: i64, retailer: &str) -> SupplierRecord {
    SupplierRecord {
        last_scraped: Utc::now(),
        ..stale_record(id, retailer)
    }
}

pub(crate) fn app_config(batch_policy: BatchPolicy) -> Arc<AppConfig> {
    Arc::new(AppConfig {
        database_url: None,
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_owned(),
        db_max_connections: 1,
        db_min_connections: 0,
        db_acquire_timeout_secs: 1,
        fetch_timeout_ms: 500,
        fetch_max_attempts: 1,
        fetch_retry_min_ms: 0,
        fetch_retry_max_ms: 0,
        user_agents: None,
        proxy_max_fails: 5,
        proxy_mode: ProxyMode::Preferred,
        stale_after_secs: 10_800,
        batch_policy,
        refresh_cron: "0 */30 * * * *".to_owned(),
    })
}

/// A refresher over `store` that knows only the fake retailers above.
pub(crate) fn refresher(store: Arc<MemorySupplierStore>, proxies: Arc<MemoryProxyStore>) -> Refresher {
    let mut registry = Registry::new();
    registry.register(Arc::new(FixedListing));
    registry.register(Arc::new(BrokenMarkup));
    registry.register(Arc::new(NoProxies));

    let fetcher = Fetcher::new(FetchConfig::default()).expect("fetcher");
    let pool = ProxyPool::new(proxies, PoolSettings::default());
    Refresher::new(Arc::new(registry), Session::new(Arc::new(fetcher), pool), store)
}
