use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use sizewatch_core::{
    MemoryProxyStore, MemorySupplierStore, ScrapeResult, ScrapeTarget, StoreError, SupplierRecord,
};

use super::*;
use crate::fetch::{FetchConfig, Fetcher};
use crate::proxy::{PoolSettings, ProxyPool};
use crate::retailers::RetailerScraper;

struct FixedListing;

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

struct BrokenMarkup;

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
        Err(ScrapeError::missing(&target.url, "price"))
    }
}

struct NoProxies;

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

fn scraped_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

fn record(id: i64, retailer: &str) -> SupplierRecord {
    SupplierRecord {
        id,
        product_id: 7,
        retailer_name: retailer.to_owned(),
        url: format!("https://shop.test/p/{id}"),
        price: Some(Decimal::new(5000, 2)),
        sizes: vec!["10".to_owned()],
        last_scraped: scraped_at(),
    }
}

fn refresher(records: Vec<SupplierRecord>) -> (Refresher, Arc<MemorySupplierStore>) {
    let mut registry = Registry::new();
    registry.register(Arc::new(FixedListing));
    registry.register(Arc::new(BrokenMarkup));
    registry.register(Arc::new(NoProxies));

    let fetcher = Arc::new(Fetcher::new(FetchConfig::default()).unwrap());
    let pool = ProxyPool::new(Arc::new(MemoryProxyStore::default()), PoolSettings::default());
    let store = Arc::new(MemorySupplierStore::new(records));
    let refresher = Refresher::new(
        Arc::new(registry),
        Session::new(fetcher, pool),
        Arc::clone(&store) as Arc<dyn SupplierStore>,
    );
    (refresher, store)
}

#[tokio::test]
async fn success_overwrites_price_sizes_and_timestamp_together() {
    let (refresher, store) = refresher(vec![record(1, "Good Shop")]);

    let outcome = refresher.update_supplierprod(&record(1, "Good Shop")).await.unwrap();

    let RefreshOutcome::Updated(updated) = outcome else {
        panic!("expected an update");
    };
    assert_eq!(updated.price, Some(Decimal::new(4500, 2)));
    assert_eq!(updated.sizes, vec!["8", "9"]);
    assert!(updated.last_scraped > scraped_at());
    assert_eq!(store.snapshot(1), Some(updated));
}

#[tokio::test]
async fn unsupported_retailer_is_a_no_op() {
    let (refresher, store) = refresher(vec![record(2, "Corner Shop")]);

    let outcome = refresher.update_supplierprod(&record(2, "Corner Shop")).await.unwrap();

    assert_eq!(outcome, RefreshOutcome::Unsupported(record(2, "Corner Shop")));
    assert_eq!(store.snapshot(2), Some(record(2, "Corner Shop")));
}

#[tokio::test]
async fn scrape_failure_propagates_and_leaves_record_untouched() {
    let (refresher, store) = refresher(vec![record(3, "Broken Shop")]);

    let err = refresher.update_supplierprod(&record(3, "Broken Shop")).await.unwrap_err();

    assert!(matches!(err, RefreshError::Scrape { supplier_product_id: 3, .. }));
    assert!(err.to_string().contains("https://shop.test/p/3"));
    assert_eq!(store.snapshot(3), Some(record(3, "Broken Shop")));
}

#[tokio::test]
async fn refresh_record_reports_missing_rows() {
    let (refresher, _store) = refresher(Vec::new());

    let err = refresher.refresh_record(99).await.unwrap_err();

    assert!(matches!(err, RefreshError::Store(StoreError::NotFound { id: 99, .. })));
}

#[tokio::test]
async fn continue_policy_visits_every_record() {
    let records = vec![
        record(1, "Broken Shop"),
        record(2, "Good Shop"),
        record(3, "Corner Shop"),
    ];
    let (refresher, store) = refresher(records.clone());

    let report = refresher.refresh_batch(&records, BatchPolicy::ContinueOnError).await;

    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.unsupported.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].supplier_product_id, 1);
    assert!(!report.aborted);
    assert!(!report.all_failed());
    assert_eq!(store.snapshot(1), Some(record(1, "Broken Shop")));
}

#[tokio::test]
async fn fail_fast_stops_at_first_failure() {
    let records = vec![record(1, "Broken Shop"), record(2, "Good Shop")];
    let (refresher, store) = refresher(records.clone());

    let report = refresher.refresh_batch(&records, BatchPolicy::FailFast).await;

    assert_eq!(report.attempted(), 1);
    assert!(report.aborted);
    assert!(report.all_failed());
    assert_eq!(store.snapshot(2), Some(record(2, "Good Shop")));
}

#[tokio::test]
async fn pool_exhaustion_aborts_even_when_continuing() {
    let records = vec![record(1, "Proxied Shop"), record(2, "Good Shop")];
    let (refresher, _store) = refresher(records.clone());

    let report = refresher.refresh_batch(&records, BatchPolicy::ContinueOnError).await;

    assert!(report.aborted);
    assert!(report.pool_exhausted);
    assert!(report.updated.is_empty());
}

#[tokio::test]
async fn refresh_product_only_touches_stale_records() {
    let mut fresh = record(2, "Good Shop");
    fresh.last_scraped = scraped_at() + Duration::hours(5);
    let (refresher, store) = refresher(vec![record(1, "Good Shop"), fresh.clone()]);

    let cutoff = scraped_at() + Duration::hours(1);
    let report = refresher
        .refresh_product(7, cutoff, BatchPolicy::ContinueOnError)
        .await
        .unwrap();

    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.updated[0].id, 1);
    assert_eq!(store.snapshot(2), Some(fresh));
}
