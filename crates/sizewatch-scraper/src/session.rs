//! Request middleware between retailer scrapers and the [`Fetcher`].
//!
//! A [`Session`] adds browser-like default headers, asks the [`ProxyPool`]
//! which proxies a request may use, and records a failure against every
//! proxy the fetcher reports as broken.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::ScrapeError;
use crate::fetch::{Fetcher, Page};
use crate::proxy::ProxyPool;

const DEFAULT_HEADERS: &[(&str, &str)] = &[
    ("cache-control", "max-age=0"),
    ("upgrade-insecure-requests", "1"),
    ("dnt", "1"),
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
    ),
    ("accept-language", "en-GB,en-US;q=0.9,en;q=0.8"),
];

#[derive(Clone)]
pub struct Session {
    fetcher: Arc<Fetcher>,
    pool: ProxyPool,
}

impl Session {
    #[must_use]
    pub fn new(fetcher: Arc<Fetcher>, pool: ProxyPool) -> Self {
        Self { fetcher, pool }
    }

    #[must_use]
    pub fn pool(&self) -> &ProxyPool {
        &self.pool
    }

    /// Starts a scraping session by clearing proxy failure counters.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Store`] if the proxy store rejects the reset.
    pub async fn begin(&self) -> Result<(), ScrapeError> {
        self.pool.reset_all().await?;
        Ok(())
    }

    /// GETs a page. `headers` override the defaults by name.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::PoolExhausted`] when a proxy is required and none is usable.
    /// - [`ScrapeError::Fetch`] when the fetch failed after retries.
    /// - [`ScrapeError::Store`] if the proxy store cannot be read.
    pub async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<Page, ScrapeError> {
        let proxies = self.pool.select_for_request().await?;
        let headers = merge_headers(headers);

        let outcome = self.fetcher.fetch(url, &headers, &proxies).await;
        for key in &outcome.proxy_failures {
            // A failed counter write must not mask the fetch result.
            if let Err(e) = self.pool.record_failure(key).await {
                tracing::error!(proxy = %key, error = %e, "could not record proxy failure");
            }
        }

        let page = outcome.result?;
        tracing::debug!(url, status = page.status, bytes = page.body.len(), "page fetched");
        Ok(page)
    }

    /// GETs a JSON endpoint and deserializes the body.
    ///
    /// # Errors
    ///
    /// Everything [`Session::get`] returns, plus [`ScrapeError::Json`] when
    /// the body does not match `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<T, ScrapeError> {
        let mut with_accept = vec![(
            "accept".to_owned(),
            "application/json, text/javascript, */*; q=0.01".to_owned(),
        )];
        with_accept.extend(headers.iter().cloned());
        self.get(url, &with_accept).await?.json()
    }
}

/// Defaults first, then `overrides`; a later header replaces an earlier one
/// with the same (case-insensitive) name.
fn merge_headers(overrides: &[(String, String)]) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = DEFAULT_HEADERS
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    for (name, value) in overrides {
        match merged
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1.clone_from(value),
            None => merged.push((name.clone(), value.clone())),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn defaults_are_browser_like() {
        let merged = merge_headers(&[]);
        assert_eq!(header(&merged, "dnt"), Some("1"));
        assert_eq!(header(&merged, "cache-control"), Some("max-age=0"));
        assert!(header(&merged, "accept").unwrap().starts_with("text/html"));
        assert!(header(&merged, "user-agent").is_none());
    }

    #[test]
    fn overrides_replace_by_name_case_insensitively() {
        let merged = merge_headers(&[
            ("Accept".to_owned(), "application/json".to_owned()),
            ("User-Agent".to_owned(), "fixed/1.0".to_owned()),
        ]);
        assert_eq!(header(&merged, "accept"), Some("application/json"));
        assert_eq!(header(&merged, "user-agent"), Some("fixed/1.0"));
        assert_eq!(
            merged.iter().filter(|(k, _)| k.eq_ignore_ascii_case("accept")).count(),
            1
        );
    }
}
