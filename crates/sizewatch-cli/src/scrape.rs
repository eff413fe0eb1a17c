//! One-off scrape of a single product page.
//!
//! Runs without a database: proxies given on the command line live in an
//! in-memory pool for the duration of the call.

use std::sync::Arc;

use anyhow::Context;
use sizewatch_core::{AppConfig, MemoryProxyStore, ProxyEndpoint, ProxyMode, ScrapeResult, ScrapeTarget};
use sizewatch_scraper::{Dispatch, FetchConfig, Fetcher, PoolSettings, ProxyPool, Registry, Session};

/// Parses `[user:pass@]host:port`.
pub(crate) fn parse_proxy(raw: &str) -> anyhow::Result<ProxyEndpoint> {
    let (credentials, address) = match raw.rsplit_once('@') {
        Some((creds, addr)) => (Some(creds), addr),
        None => (None, raw),
    };
    let (host, port) = address
        .rsplit_once(':')
        .with_context(|| format!("proxy '{raw}' is missing a port"))?;
    if host.is_empty() {
        anyhow::bail!("proxy '{raw}' is missing a host");
    }
    let port: u16 = port
        .parse()
        .with_context(|| format!("proxy '{raw}' has an invalid port"))?;

    let endpoint = ProxyEndpoint::new(host, port);
    match credentials {
        Some(creds) => {
            let (user, pass) = creds
                .split_once(':')
                .with_context(|| format!("proxy '{raw}' credentials must be user:pass"))?;
            Ok(endpoint.with_credentials(user, pass))
        }
        None => Ok(endpoint),
    }
}

/// Scrapes `url` with the scraper registered for `retailer`.
///
/// # Errors
///
/// Returns an error if no scraper handles `retailer`, a proxy argument does
/// not parse, or the scrape itself fails.
pub(crate) async fn scrape_once(
    config: &AppConfig,
    retailer: &str,
    url: &str,
    proxies: &[String],
) -> anyhow::Result<ScrapeResult> {
    let registry = Registry::with_default_retailers();
    let Dispatch::Supported(scraper) = registry.scraper_for(retailer) else {
        anyhow::bail!(
            "no scraper for retailer '{retailer}'; run `sizewatch-cli retailers` for the list"
        );
    };

    let endpoints = proxies
        .iter()
        .map(|raw| parse_proxy(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mut settings = PoolSettings::from_app_config(config);
    if endpoints.is_empty() && settings.mode == ProxyMode::Required {
        tracing::warn!("no --proxy given; scraping directly despite required proxy mode");
        settings.mode = ProxyMode::Direct;
    }

    let fetcher = Fetcher::new(FetchConfig::from_app_config(config))?;
    let pool = ProxyPool::new(Arc::new(MemoryProxyStore::new(endpoints)), settings);
    let session = Session::new(Arc::new(fetcher), pool);

    let result = scraper
        .scrape(&session, &ScrapeTarget::new(retailer, url))
        .await
        .with_context(|| format!("scraping {url}"))?;
    Ok(result)
}

pub(crate) async fn run_scrape(
    config: &AppConfig,
    retailer: &str,
    url: &str,
    proxies: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let result = scrape_once(config, retailer, url, proxies).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("price: {}", result.price());
        if result.sizes().is_empty() {
            println!("sizes: none in stock");
        } else {
            println!("sizes: {}", result.sizes().join(", "));
        }
    }
    Ok(())
}
