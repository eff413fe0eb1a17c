use sizewatch_core::{ProxyKey, StoreError};
use thiserror::Error;

/// A raw price string that could not be turned into a decimal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse price {raw:?}: {reason}")]
pub struct NormalizeError {
    pub raw: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure: connect, TLS, timeout or a broken body.
    #[error("HTTP error fetching {url}{}: {source}", via(.proxy.as_ref()))]
    Transport {
        url: String,
        proxy: Option<ProxyKey>,
        #[source]
        source: reqwest::Error,
    },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid proxy {proxy}: {reason}")]
    InvalidProxy { proxy: String, reason: String },

    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

fn via(proxy: Option<&ProxyKey>) -> String {
    proxy.map(|p| format!(" via {p}")).unwrap_or_default()
}

impl FetchError {
    /// The proxy blamed for this failure, if it was a transport failure
    /// through one.
    #[must_use]
    pub fn failed_proxy(&self) -> Option<&ProxyKey> {
        match self {
            Self::Transport { proxy, .. } => proxy.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not extract {field} from {url}: {reason}")]
    Extraction {
        url: String,
        field: &'static str,
        reason: String,
    },

    #[error("JSON error for {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("bad price on {url}: {source}")]
    Normalize {
        url: String,
        #[source]
        source: NormalizeError,
    },

    /// No proxy is below the failure threshold and the session requires one.
    #[error("proxy pool exhausted: no proxy has fewer than {max_fails} failures")]
    PoolExhausted { max_fails: u32 },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ScrapeError {
    pub(crate) fn extraction(url: &str, field: &'static str, reason: impl Into<String>) -> Self {
        Self::Extraction {
            url: url.to_owned(),
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(url: &str, field: &'static str) -> Self {
        Self::extraction(url, field, "not present on page")
    }

    /// Errors after which no further record in the same session can succeed.
    #[must_use]
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::PoolExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_exhausted_is_the_only_session_fatal_error() {
        assert!(ScrapeError::PoolExhausted { max_fails: 5 }.is_session_fatal());
        assert!(!ScrapeError::missing("https://x.test/p", "price").is_session_fatal());
        let not_found = ScrapeError::from(FetchError::NotFound {
            url: "https://x.test/p".to_owned(),
        });
        assert!(!not_found.is_session_fatal());
    }

    #[test]
    fn failed_proxy_only_for_transport_errors() {
        let err = FetchError::UnexpectedStatus {
            status: 503,
            url: "https://x.test".to_owned(),
        };
        assert!(err.failed_proxy().is_none());
    }

    #[test]
    fn extraction_message_names_field_and_url() {
        let err = ScrapeError::missing("https://x.test/p", "price");
        assert_eq!(
            err.to_string(),
            "could not extract price from https://x.test/p: not present on page"
        );
    }
}
