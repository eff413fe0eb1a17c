//! Supplier-product records and the scrape targets derived from them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The association between a catalog product and one retailer's listing of it.
///
/// Only `price`, `sizes` and `last_scraped` are ever written by the scraping
/// engine, and always together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRecord {
    pub id: i64,
    pub product_id: i64,
    /// Retailer display name, e.g. `"Sports Direct"`.
    pub retailer_name: String,
    /// Product page on the retailer's site.
    pub url: String,
    pub price: Option<Decimal>,
    pub sizes: Vec<String>,
    pub last_scraped: DateTime<Utc>,
}

impl SupplierRecord {
    #[must_use]
    pub fn target(&self) -> ScrapeTarget {
        ScrapeTarget::new(&self.retailer_name, &self.url)
    }

    /// `true` when the record was last scraped at or before `cutoff`.
    #[must_use]
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_scraped <= cutoff
    }
}

/// One (retailer, product page) pair to scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTarget {
    /// Dispatch key: lowercase retailer name with whitespace removed.
    pub retailer: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl ScrapeTarget {
    #[must_use]
    pub fn new(retailer_name: &str, url: &str) -> Self {
        Self {
            retailer: dispatch_key(retailer_name),
            url: url.to_owned(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Derives the registry key for a retailer display name.
///
/// `"Sports Direct"` becomes `"sportsdirect"`, `"JD Sports"` becomes `"jdsports"`.
#[must_use]
pub fn dispatch_key(retailer_name: &str) -> String {
    retailer_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn record(last_scraped: DateTime<Utc>) -> SupplierRecord {
        SupplierRecord {
            id: 1,
            product_id: 10,
            retailer_name: "Sports Direct".to_owned(),
            url: "https://www.sportsdirect.com/nike-air-max-1".to_owned(),
            price: None,
            sizes: Vec::new(),
            last_scraped,
        }
    }

    #[test]
    fn dispatch_key_lowercases_and_strips_whitespace() {
        assert_eq!(dispatch_key("Sports Direct"), "sportsdirect");
        assert_eq!(dispatch_key("  Urban\tOutfitters "), "urbanoutfitters");
        assert_eq!(dispatch_key("END. Clothing"), "end.clothing");
    }

    #[test]
    fn target_uses_dispatch_key() {
        let target = record(Utc::now()).target();
        assert_eq!(target.retailer, "sportsdirect");
        assert_eq!(target.url, "https://www.sportsdirect.com/nike-air-max-1");
        assert!(target.headers.is_empty());
    }

    #[test]
    fn staleness_is_inclusive_of_cutoff() {
        let now = Utc::now();
        let rec = record(now - Duration::hours(3));
        assert!(rec.is_stale(now - Duration::hours(3)));
        assert!(rec.is_stale(now));
        assert!(!rec.is_stale(now - Duration::hours(4)));
    }
}
