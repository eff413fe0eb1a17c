//! In-process implementations of the persistence traits.
//!
//! Used by the CLI's database-free `scrape` command and by tests. Failure
//! counters are atomics so concurrent scrapers never lose an increment.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::proxies::{ProxyEndpoint, ProxyKey};
use crate::scrape::ScrapeResult;
use crate::store::{ProxyStore, StoreError, SupplierStore};
use crate::suppliers::SupplierRecord;

struct ProxySlot {
    endpoint: ProxyEndpoint,
    fail_count: AtomicU32,
}

#[derive(Default)]
pub struct MemoryProxyStore {
    slots: RwLock<Vec<ProxySlot>>,
}

impl MemoryProxyStore {
    #[must_use]
    pub fn new(endpoints: Vec<ProxyEndpoint>) -> Self {
        let slots = endpoints
            .into_iter()
            .map(|endpoint| ProxySlot {
                fail_count: AtomicU32::new(endpoint.fail_count),
                endpoint,
            })
            .collect();
        Self {
            slots: RwLock::new(slots),
        }
    }

    pub fn add(&self, endpoint: ProxyEndpoint) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.push(ProxySlot {
            fail_count: AtomicU32::new(endpoint.fail_count),
            endpoint,
        });
    }

    /// Current failure count of the endpoint with this exact host and port.
    #[must_use]
    pub fn fail_count(&self, host: &str, port: u16) -> Option<u32> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots
            .iter()
            .find(|s| s.endpoint.host == host && s.endpoint.port == port)
            .map(|s| s.fail_count.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl ProxyStore for MemoryProxyStore {
    async fn list_proxies(&self) -> Result<Vec<ProxyEndpoint>, StoreError> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        Ok(slots
            .iter()
            .map(|s| ProxyEndpoint {
                fail_count: s.fail_count.load(Ordering::SeqCst),
                ..s.endpoint.clone()
            })
            .collect())
    }

    async fn increment_fail_count(&self, key: &ProxyKey) -> Result<u64, StoreError> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let mut touched = 0u64;
        for slot in slots.iter().filter(|s| key.matches(&s.endpoint)) {
            slot.fail_count.fetch_add(1, Ordering::SeqCst);
            touched += 1;
        }
        Ok(touched)
    }

    async fn reset_fail_counts(&self) -> Result<u64, StoreError> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        for slot in slots.iter() {
            slot.fail_count.store(0, Ordering::SeqCst);
        }
        Ok(slots.len() as u64)
    }
}

#[derive(Default)]
pub struct MemorySupplierStore {
    records: Mutex<BTreeMap<i64, SupplierRecord>>,
}

impl MemorySupplierStore {
    #[must_use]
    pub fn new(records: Vec<SupplierRecord>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().map(|r| (r.id, r)).collect()),
        }
    }

    pub fn insert(&self, record: SupplierRecord) {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.id, record);
    }

    /// Copy of the stored record, bypassing the async trait.
    #[must_use]
    pub fn snapshot(&self, id: i64) -> Option<SupplierRecord> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.get(&id).cloned()
    }
}

#[async_trait]
impl SupplierStore for MemorySupplierStore {
    async fn get_supplier_product(&self, id: i64) -> Result<SupplierRecord, StoreError> {
        self.snapshot(id).ok_or(StoreError::NotFound {
            entity: "supplier product",
            id,
        })
    }

    async fn list_for_product(&self, product_id: i64) -> Result<Vec<SupplierRecord>, StoreError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn list_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<SupplierRecord>, StoreError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records
            .values()
            .filter(|r| r.is_stale(cutoff))
            .cloned()
            .collect())
    }

    async fn apply_scrape(
        &self,
        id: i64,
        result: &ScrapeResult,
        scraped_at: DateTime<Utc>,
    ) -> Result<SupplierRecord, StoreError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let record = records.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "supplier product",
            id,
        })?;
        record.price = Some(result.price());
        record.sizes = result.sizes().to_vec();
        record.last_scraped = scraped_at;
        Ok(record.clone())
    }
}
