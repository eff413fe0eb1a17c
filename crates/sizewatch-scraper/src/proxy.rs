//! Proxy pool over a [`ProxyStore`].
//!
//! The pool never caches endpoints: every selection is a fresh snapshot read
//! so that failures recorded by concurrent scrapers take effect on the next
//! request. Failure counters are only ever incremented through the store's
//! atomic increment.

use std::sync::Arc;

use sizewatch_core::{AppConfig, ProxyEndpoint, ProxyKey, ProxyStore, StoreError};

pub use sizewatch_core::ProxyMode;

use crate::error::ScrapeError;

pub const DEFAULT_MAX_FAILS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Endpoints with `fail_count >= max_fails` are never selected.
    pub max_fails: u32,
    pub mode: ProxyMode,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_fails: DEFAULT_MAX_FAILS,
            mode: ProxyMode::default(),
        }
    }
}

impl PoolSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_fails: config.proxy_max_fails,
            mode: config.proxy_mode,
        }
    }
}

#[derive(Clone)]
pub struct ProxyPool {
    store: Arc<dyn ProxyStore>,
    settings: PoolSettings,
}

impl ProxyPool {
    #[must_use]
    pub fn new(store: Arc<dyn ProxyStore>, settings: PoolSettings) -> Self {
        Self { store, settings }
    }

    #[must_use]
    pub fn settings(&self) -> PoolSettings {
        self.settings
    }

    /// Endpoints currently below the failure threshold.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the proxy store cannot be read.
    pub async fn active_endpoints(&self) -> Result<Vec<ProxyEndpoint>, StoreError> {
        self.store.list_active_proxies(self.settings.max_fails).await
    }

    /// Counts one failure against every endpoint matching `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the increment could not be written.
    pub async fn record_failure(&self, key: &ProxyKey) -> Result<u64, StoreError> {
        let touched = self.store.increment_fail_count(key).await?;
        tracing::warn!(proxy = %key, touched, "recorded proxy failure");
        Ok(touched)
    }

    /// Clears every failure counter. Run once when a scraping session starts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the reset could not be written.
    pub async fn reset_all(&self) -> Result<u64, StoreError> {
        let reset = self.store.reset_fail_counts().await?;
        tracing::info!(reset, "proxy failure counters reset");
        Ok(reset)
    }

    /// The proxies one outbound request may choose from, according to the
    /// pool's [`ProxyMode`]. An empty list means the request goes direct.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::PoolExhausted`] in [`ProxyMode::Required`] when no
    ///   endpoint is below the threshold.
    /// - [`ScrapeError::Store`] if the proxy store cannot be read.
    pub async fn select_for_request(&self) -> Result<Vec<ProxyEndpoint>, ScrapeError> {
        if self.settings.mode == ProxyMode::Direct {
            return Ok(Vec::new());
        }

        let active = self.active_endpoints().await?;
        if active.is_empty() {
            if self.settings.mode == ProxyMode::Required {
                tracing::error!(
                    max_fails = self.settings.max_fails,
                    "no usable proxy left; aborting session"
                );
                return Err(ScrapeError::PoolExhausted {
                    max_fails: self.settings.max_fails,
                });
            }
            tracing::debug!("no active proxies; requesting directly");
        }
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use sizewatch_core::MemoryProxyStore;

    use super::*;

    fn pool(mode: ProxyMode, max_fails: u32) -> (Arc<MemoryProxyStore>, ProxyPool) {
        let store = Arc::new(MemoryProxyStore::new(vec![
            ProxyEndpoint::new("10.0.0.1", 3128),
            ProxyEndpoint::new("10.0.0.2", 3128).with_credentials("scraper", "s3cret"),
        ]));
        let pool = ProxyPool::new(store.clone(), PoolSettings { max_fails, mode });
        (store, pool)
    }

    #[tokio::test]
    async fn endpoint_is_excluded_after_max_fails_and_restored_by_reset() {
        let (_, pool) = pool(ProxyMode::Preferred, 3);
        let key = ProxyKey::host("10.0.0.1");

        for _ in 0..2 {
            pool.record_failure(&key).await.unwrap();
        }
        assert_eq!(pool.active_endpoints().await.unwrap().len(), 2);

        pool.record_failure(&key).await.unwrap();
        let active = pool.active_endpoints().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].host, "10.0.0.2");

        pool.reset_all().await.unwrap();
        assert_eq!(pool.active_endpoints().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn required_mode_fails_when_every_proxy_is_blacklisted() {
        let (_, pool) = pool(ProxyMode::Required, 1);
        pool.record_failure(&ProxyKey::host("10.0.0.1")).await.unwrap();
        pool.record_failure(&ProxyKey::host("10.0.0.2")).await.unwrap();

        let err = pool.select_for_request().await.unwrap_err();
        assert!(matches!(err, ScrapeError::PoolExhausted { max_fails: 1 }));
        assert!(err.is_session_fatal());
    }

    #[tokio::test]
    async fn preferred_mode_falls_back_to_direct() {
        let (_, pool) = pool(ProxyMode::Preferred, 1);
        pool.record_failure(&ProxyKey::host("10.0.0.1")).await.unwrap();
        pool.record_failure(&ProxyKey::host("10.0.0.2")).await.unwrap();

        assert!(pool.select_for_request().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn direct_mode_ignores_the_store() {
        let (_, pool) = pool(ProxyMode::Direct, 5);
        assert!(pool.select_for_request().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_failures_are_all_counted() {
        let (store, pool) = pool(ProxyMode::Preferred, 100);
        let key = ProxyEndpoint::new("10.0.0.1", 3128).key();

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let pool = pool.clone();
                let key = key.clone();
                tokio::spawn(async move { pool.record_failure(&key).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.fail_count("10.0.0.1", 3128), Some(25));
    }
}
