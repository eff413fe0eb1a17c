//! Persistence seams for the scraping engine.
//!
//! The engine never owns a schema. It reads proxies and supplier-product
//! records, increments proxy failure counters, and writes scrape results
//! through these traits. `sizewatch-db` implements them over Postgres and
//! [`crate::memory`] implements them in-process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::proxies::{ProxyEndpoint, ProxyKey};
use crate::scrape::ScrapeResult;
use crate::suppliers::SupplierRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

#[async_trait]
pub trait ProxyStore: Send + Sync {
    /// Every administered proxy, blacklisted or not.
    async fn list_proxies(&self) -> Result<Vec<ProxyEndpoint>, StoreError>;

    /// Proxies whose `fail_count` is strictly below `max_fails`.
    ///
    /// A snapshot read: concurrent increments may land right after it.
    async fn list_active_proxies(&self, max_fails: u32) -> Result<Vec<ProxyEndpoint>, StoreError> {
        let all = self.list_proxies().await?;
        Ok(all.into_iter().filter(|p| p.fail_count < max_fails).collect())
    }

    /// Adds one to `fail_count` of every endpoint matching `key`, as a single
    /// atomic operation at the storage layer. Returns the number of endpoints
    /// touched.
    async fn increment_fail_count(&self, key: &ProxyKey) -> Result<u64, StoreError>;

    /// Sets every endpoint's `fail_count` back to zero.
    async fn reset_fail_counts(&self) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait SupplierStore: Send + Sync {
    async fn get_supplier_product(&self, id: i64) -> Result<SupplierRecord, StoreError>;

    async fn list_for_product(&self, product_id: i64) -> Result<Vec<SupplierRecord>, StoreError>;

    /// Records whose `last_scraped` is at or before `cutoff`.
    async fn list_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<SupplierRecord>, StoreError>;

    async fn list_stale_for_product(
        &self,
        product_id: i64,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SupplierRecord>, StoreError> {
        let all = self.list_for_product(product_id).await?;
        Ok(all.into_iter().filter(|r| r.is_stale(cutoff)).collect())
    }

    /// Overwrites `price`, `sizes` and `last_scraped` in one write and returns
    /// the updated record.
    async fn apply_scrape(
        &self,
        id: i64,
        result: &ScrapeResult,
        scraped_at: DateTime<Utc>,
    ) -> Result<SupplierRecord, StoreError>;
}
