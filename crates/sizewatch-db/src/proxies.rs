//! Database operations for the `proxies` table.

use async_trait::async_trait;
use sizewatch_core::{ProxyEndpoint, ProxyKey, ProxyStore, StoreError};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `proxies` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProxyRow {
    pub id: i64,
    pub host: String,
    /// The schema constrains this to `1..=65535`.
    pub port: i32,
    pub username: Option<String>,
    pub password: Option<String>,
    pub fail_count: i32,
}

impl TryFrom<ProxyRow> for ProxyEndpoint {
    type Error = DbError;

    fn try_from(row: ProxyRow) -> Result<Self, Self::Error> {
        let invalid = |reason: String| DbError::InvalidRow {
            table: "proxies",
            id: row.id,
            reason,
        };
        let port = u16::try_from(row.port)
            .map_err(|_| invalid(format!("port {} out of range", row.port)))?;
        let fail_count = u32::try_from(row.fail_count)
            .map_err(|_| invalid(format!("negative fail_count {}", row.fail_count)))?;
        Ok(ProxyEndpoint {
            host: row.host,
            port,
            username: row.username,
            password: row.password,
            fail_count,
        })
    }
}

const PROXY_COLUMNS: &str = "id, host, port, username, password, fail_count";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns every proxy, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_proxies(pool: &PgPool) -> Result<Vec<ProxyRow>, DbError> {
    let rows = sqlx::query_as::<_, ProxyRow>(&format!(
        "SELECT {PROXY_COLUMNS} FROM proxies ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the proxies whose `fail_count` is below `max_fails`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_proxies(pool: &PgPool, max_fails: u32) -> Result<Vec<ProxyRow>, DbError> {
    let max_fails = i32::try_from(max_fails).unwrap_or(i32::MAX);
    let rows = sqlx::query_as::<_, ProxyRow>(&format!(
        "SELECT {PROXY_COLUMNS} FROM proxies WHERE fail_count < $1 ORDER BY id"
    ))
    .bind(max_fails)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Adds one to `fail_count` for every proxy on `host` (and `port`, when
/// given) in a single statement, so concurrent scrapers never lose an
/// increment. Returns the number of rows touched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn increment_proxy_fail_count(
    pool: &PgPool,
    host: &str,
    port: Option<u16>,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE proxies SET fail_count = fail_count + 1 \
         WHERE host = $1 AND ($2::INTEGER IS NULL OR port = $2)",
    )
    .bind(host)
    .bind(port.map(i32::from))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Sets `fail_count = 0` on every proxy. Returns the number of rows touched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn reset_proxy_fail_counts(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("UPDATE proxies SET fail_count = 0 WHERE fail_count <> 0")
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

fn into_endpoints(rows: Vec<ProxyRow>) -> Result<Vec<ProxyEndpoint>, StoreError> {
    rows.into_iter()
        .map(|row| ProxyEndpoint::try_from(row).map_err(StoreError::from))
        .collect()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// [`ProxyStore`] over the `proxies` table.
#[derive(Debug, Clone)]
pub struct PgProxyStore {
    pool: PgPool,
}

impl PgProxyStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProxyStore for PgProxyStore {
    async fn list_proxies(&self) -> Result<Vec<ProxyEndpoint>, StoreError> {
        into_endpoints(list_proxies(&self.pool).await?)
    }

    async fn list_active_proxies(&self, max_fails: u32) -> Result<Vec<ProxyEndpoint>, StoreError> {
        into_endpoints(list_active_proxies(&self.pool, max_fails).await?)
    }

    async fn increment_fail_count(&self, key: &ProxyKey) -> Result<u64, StoreError> {
        Ok(increment_proxy_fail_count(&self.pool, &key.host, key.port).await?)
    }

    async fn reset_fail_counts(&self) -> Result<u64, StoreError> {
        Ok(reset_proxy_fail_counts(&self.pool).await?)
    }
}
