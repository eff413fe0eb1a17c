pub mod app_config;
pub mod config;
pub mod memory;
pub mod proxies;
pub mod scrape;
pub mod store;
pub mod suppliers;

pub use app_config::{AppConfig, BatchPolicy, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use memory::{MemoryProxyStore, MemorySupplierStore};
pub use proxies::{ProxyEndpoint, ProxyKey, ProxyMode};
pub use scrape::ScrapeResult;
pub use store::{ProxyStore, StoreError, SupplierStore};
pub use suppliers::{dispatch_key, ScrapeTarget, SupplierRecord};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
