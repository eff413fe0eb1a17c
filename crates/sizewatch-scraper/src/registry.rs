//! Maps retailer display names to scrapers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::retailers::{self, RetailerScraper};

pub use sizewatch_core::dispatch_key;

/// Result of looking a retailer up.
#[derive(Clone)]
pub enum Dispatch {
    Supported(Arc<dyn RetailerScraper>),
    /// No scraper is registered; callers treat this as a no-op.
    Unsupported,
}

impl Dispatch {
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported(_))
    }
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supported(scraper) => f.debug_tuple("Supported").field(&scraper.key()).finish(),
            Self::Unsupported => f.write_str("Unsupported"),
        }
    }
}

#[derive(Clone, Default)]
pub struct Registry {
    scrapers: HashMap<&'static str, Arc<dyn RetailerScraper>>,
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in retailer scraper.
    #[must_use]
    pub fn with_default_retailers() -> Self {
        let mut registry = Self::new();
        for scraper in retailers::all() {
            registry.register(scraper);
        }
        registry
    }

    /// Registers `scraper` under its own key, replacing any previous one.
    pub fn register(&mut self, scraper: Arc<dyn RetailerScraper>) {
        self.scrapers.insert(scraper.key(), scraper);
    }

    /// Looks up the scraper for a retailer display name such as
    /// `"Sports Direct"`.
    #[must_use]
    pub fn scraper_for(&self, retailer_name: &str) -> Dispatch {
        match self.scrapers.get(dispatch_key(retailer_name).as_str()) {
            Some(scraper) => Dispatch::Supported(Arc::clone(scraper)),
            None => Dispatch::Unsupported,
        }
    }

    /// Registered dispatch keys, sorted.
    #[must_use]
    pub fn supported(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.scrapers.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_resolve_to_scrapers() {
        let registry = Registry::with_default_retailers();
        match registry.scraper_for("Sports Direct") {
            Dispatch::Supported(scraper) => assert_eq!(scraper.key(), "sportsdirect"),
            Dispatch::Unsupported => panic!("sports direct should be supported"),
        }
        assert!(registry.scraper_for("JD Sports").is_supported());
        assert!(registry.scraper_for("END Clothing").is_supported());
        assert!(registry.scraper_for("Lady Foot Locker").is_supported());
        assert!(registry.scraper_for("Road Runner Sports").is_supported());
    }

    #[test]
    fn unknown_retailer_is_unsupported() {
        let registry = Registry::with_default_retailers();
        assert!(!registry.scraper_for("Corner Shop").is_supported());
        assert!(!Registry::new().scraper_for("Nike").is_supported());
    }

    #[test]
    fn supported_keys_are_sorted_and_unique() {
        let keys = Registry::with_default_retailers().supported();
        assert_eq!(keys.len(), 33);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(keys.first(), Some(&"academy"));
        assert_eq!(keys.last(), Some(&"zappos"));
    }
}
