use std::net::SocketAddr;

use crate::proxies::ProxyMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// What a multi-record refresh does when one record fails to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    /// Keep scraping the remaining records and report every failure.
    #[default]
    ContinueOnError,
    /// Stop at the first failure.
    FailFast,
}

impl std::str::FromStr for BatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" | "continue-on-error" => Ok(Self::ContinueOnError),
            "fail-fast" | "failfast" => Ok(Self::FailFast),
            other => Err(format!(
                "unknown batch policy '{other}'; expected continue or fail-fast"
            )),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Required by the database-backed commands and the server only.
    pub database_url: Option<String>,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub fetch_timeout_ms: u64,
    pub fetch_max_attempts: u32,
    pub fetch_retry_min_ms: u64,
    pub fetch_retry_max_ms: u64,
    /// `None` selects the built-in user-agent pool; an empty list means the
    /// fallback agent is always used.
    pub user_agents: Option<Vec<String>>,
    pub proxy_max_fails: u32,
    pub proxy_mode: ProxyMode,
    pub stale_after_secs: u64,
    pub batch_policy: BatchPolicy,
    pub refresh_cron: String,
}

impl AppConfig {
    /// Returns the database URL, or an error naming the missing variable.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::MissingEnvVar`] when `DATABASE_URL` was not set.
    pub fn require_database_url(&self) -> Result<&str, crate::ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| crate::ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }

    /// The window after which a supplier record is due for a refresh.
    #[must_use]
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.stale_after_secs).unwrap_or(i64::MAX))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_timeout_ms", &self.fetch_timeout_ms)
            .field("fetch_max_attempts", &self.fetch_max_attempts)
            .field("fetch_retry_min_ms", &self.fetch_retry_min_ms)
            .field("fetch_retry_max_ms", &self.fetch_retry_max_ms)
            .field(
                "user_agents",
                &self.user_agents.as_ref().map(Vec::len),
            )
            .field("proxy_max_fails", &self.proxy_max_fails)
            .field("proxy_mode", &self.proxy_mode)
            .field("stale_after_secs", &self.stale_after_secs)
            .field("batch_policy", &self.batch_policy)
            .field("refresh_cron", &self.refresh_cron)
            .finish()
    }
}
