//! Scrape orchestration: look a supplier record's retailer up, scrape its
//! page and write price, sizes and `last_scraped` back in a single store
//! call. A failed scrape never touches the stored record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sizewatch_core::{StoreError, SupplierRecord, SupplierStore};
use thiserror::Error;

use crate::error::ScrapeError;
use crate::registry::{Dispatch, Registry};
use crate::session::Session;

pub use sizewatch_core::BatchPolicy;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("supplier product {supplier_product_id}: {source}")]
    Scrape {
        supplier_product_id: i64,
        #[source]
        source: ScrapeError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RefreshError {
    /// `true` when the remaining records of a batch cannot succeed either.
    #[must_use]
    pub fn is_session_fatal(&self) -> bool {
        match self {
            Self::Scrape { source, .. } => source.is_session_fatal(),
            Self::Store(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Scraped and written back.
    Updated(SupplierRecord),
    /// No scraper for the retailer; returned unchanged.
    Unsupported(SupplierRecord),
}

impl RefreshOutcome {
    #[must_use]
    pub fn record(&self) -> &SupplierRecord {
        match self {
            Self::Updated(r) | Self::Unsupported(r) => r,
        }
    }

    #[must_use]
    pub fn into_record(self) -> SupplierRecord {
        match self {
            Self::Updated(r) | Self::Unsupported(r) => r,
        }
    }
}

/// One record a batch could not refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub supplier_product_id: i64,
    pub message: String,
}

/// Summary of a multi-record refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub updated: Vec<SupplierRecord>,
    pub unsupported: Vec<SupplierRecord>,
    pub failed: Vec<RecordFailure>,
    /// Set when the batch stopped before visiting every record.
    pub aborted: bool,
    /// Set when the stop was caused by proxy pool exhaustion.
    pub pool_exhausted: bool,
}

impl BatchReport {
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.updated.len() + self.unsupported.len() + self.failed.len()
    }

    /// Updated records followed by the unsupported ones passed through.
    #[must_use]
    pub fn records(&self) -> Vec<SupplierRecord> {
        self.updated
            .iter()
            .chain(&self.unsupported)
            .cloned()
            .collect()
    }

    /// `true` when some scrape failed and none succeeded.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.failed.is_empty() && self.updated.is_empty()
    }
}

#[derive(Clone)]
pub struct Refresher {
    registry: Arc<Registry>,
    session: Session,
    store: Arc<dyn SupplierStore>,
}

impl Refresher {
    #[must_use]
    pub fn new(registry: Arc<Registry>, session: Session, store: Arc<dyn SupplierStore>) -> Self {
        Self {
            registry,
            session,
            store,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Scrapes `record`'s page and persists the result.
    ///
    /// # Errors
    ///
    /// - [`RefreshError::Scrape`] when the scraper failed; the stored record
    ///   is left as it was.
    /// - [`RefreshError::Store`] when the write-back failed.
    pub async fn update_supplierprod(
        &self,
        record: &SupplierRecord,
    ) -> Result<RefreshOutcome, RefreshError> {
        let scraper = match self.registry.scraper_for(&record.retailer_name) {
            Dispatch::Supported(scraper) => scraper,
            Dispatch::Unsupported => {
                tracing::debug!(
                    supplier_product_id = record.id,
                    retailer = %record.retailer_name,
                    "no scraper registered; record left as is"
                );
                return Ok(RefreshOutcome::Unsupported(record.clone()));
            }
        };

        let target = record.target();
        let result = scraper
            .scrape(&self.session, &target)
            .await
            .map_err(|source| RefreshError::Scrape {
                supplier_product_id: record.id,
                source,
            })?;

        let updated = self.store.apply_scrape(record.id, &result, Utc::now()).await?;
        tracing::debug!(
            supplier_product_id = updated.id,
            retailer = %target.retailer,
            sizes = updated.sizes.len(),
            "supplier product refreshed"
        );
        Ok(RefreshOutcome::Updated(updated))
    }

    /// Loads a record by id and refreshes it.
    ///
    /// # Errors
    ///
    /// [`RefreshError::Store`] when the record does not exist, plus anything
    /// [`Refresher::update_supplierprod`] returns.
    pub async fn refresh_record(&self, id: i64) -> Result<RefreshOutcome, RefreshError> {
        let record = self.store.get_supplier_product(id).await?;
        self.update_supplierprod(&record).await
    }

    /// Refreshes `records` one after another.
    ///
    /// Failures are collected into the report. Under
    /// [`BatchPolicy::FailFast`] the first failure stops the batch; a proxy
    /// pool exhaustion stops it under either policy.
    pub async fn refresh_batch(
        &self,
        records: &[SupplierRecord],
        policy: BatchPolicy,
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for (index, record) in records.iter().enumerate() {
            match self.update_supplierprod(record).await {
                Ok(RefreshOutcome::Updated(r)) => report.updated.push(r),
                Ok(RefreshOutcome::Unsupported(r)) => report.unsupported.push(r),
                Err(e) => {
                    tracing::error!(
                        supplier_product_id = record.id,
                        retailer = %record.retailer_name,
                        url = %record.url,
                        error = %e,
                        "supplier product refresh failed"
                    );
                    let fatal = e.is_session_fatal();
                    report.failed.push(RecordFailure {
                        supplier_product_id: record.id,
                        message: e.to_string(),
                    });
                    if fatal || policy == BatchPolicy::FailFast {
                        report.aborted = index + 1 < records.len();
                        report.pool_exhausted = fatal;
                        break;
                    }
                }
            }
        }

        tracing::info!(
            total = records.len(),
            updated = report.updated.len(),
            unsupported = report.unsupported.len(),
            failed = report.failed.len(),
            aborted = report.aborted,
            "batch refresh finished"
        );
        report
    }

    /// Refreshes one product's supplier records last scraped at or before
    /// `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::Store`] if the records cannot be listed.
    pub async fn refresh_product(
        &self,
        product_id: i64,
        cutoff: DateTime<Utc>,
        policy: BatchPolicy,
    ) -> Result<BatchReport, RefreshError> {
        let records = self.store.list_stale_for_product(product_id, cutoff).await?;
        tracing::debug!(product_id, stale = records.len(), "refreshing product");
        Ok(self.refresh_batch(&records, policy).await)
    }

    /// Refreshes every supplier record last scraped at or before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::Store`] if the records cannot be listed.
    pub async fn refresh_stale(
        &self,
        cutoff: DateTime<Utc>,
        policy: BatchPolicy,
    ) -> Result<BatchReport, RefreshError> {
        let records = self.store.list_stale(cutoff).await?;
        Ok(self.refresh_batch(&records, policy).await)
    }
}

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;
