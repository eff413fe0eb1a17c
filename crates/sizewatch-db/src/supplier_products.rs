//! Database operations for the `supplier_products` table.
//!
//! The scraper only ever writes `price`, `sizes` and `last_scraped`, and
//! always in one `UPDATE`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sizewatch_core::{ScrapeResult, StoreError, SupplierRecord, SupplierStore};
use sqlx::PgPool;

use crate::DbError;

const ENTITY: &str = "supplier product";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `supplier_products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SupplierProductRow {
    pub id: i64,
    pub product_id: i64,
    pub retailer_name: String,
    pub url: String,
    pub price: Option<Decimal>,
    pub sizes: Vec<String>,
    pub last_scraped: DateTime<Utc>,
}

impl From<SupplierProductRow> for SupplierRecord {
    fn from(row: SupplierProductRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            retailer_name: row.retailer_name,
            url: row.url,
            price: row.price,
            sizes: row.sizes,
            last_scraped: row.last_scraped,
        }
    }
}

const SUPPLIER_PRODUCT_COLUMNS: &str =
    "id, product_id, retailer_name, url, price, sizes, last_scraped";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns one supplier product by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_supplier_product(pool: &PgPool, id: i64) -> Result<SupplierProductRow, DbError> {
    sqlx::query_as::<_, SupplierProductRow>(&format!(
        "SELECT {SUPPLIER_PRODUCT_COLUMNS} FROM supplier_products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns every supplier product of a catalog product, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_supplier_products_for_product(
    pool: &PgPool,
    product_id: i64,
) -> Result<Vec<SupplierProductRow>, DbError> {
    let rows = sqlx::query_as::<_, SupplierProductRow>(&format!(
        "SELECT {SUPPLIER_PRODUCT_COLUMNS} FROM supplier_products \
         WHERE product_id = $1 ORDER BY id"
    ))
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns supplier products last scraped at or before `cutoff`, oldest
/// first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stale_supplier_products(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<SupplierProductRow>, DbError> {
    let rows = sqlx::query_as::<_, SupplierProductRow>(&format!(
        "SELECT {SUPPLIER_PRODUCT_COLUMNS} FROM supplier_products \
         WHERE last_scraped <= $1 ORDER BY last_scraped, id"
    ))
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Like [`list_stale_supplier_products`], restricted to one catalog product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stale_supplier_products_for_product(
    pool: &PgPool,
    product_id: i64,
    cutoff: DateTime<Utc>,
) -> Result<Vec<SupplierProductRow>, DbError> {
    let rows = sqlx::query_as::<_, SupplierProductRow>(&format!(
        "SELECT {SUPPLIER_PRODUCT_COLUMNS} FROM supplier_products \
         WHERE product_id = $1 AND last_scraped <= $2 ORDER BY id"
    ))
    .bind(product_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Overwrites `price`, `sizes` and `last_scraped` in one statement and
/// returns the updated row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn apply_scrape(
    pool: &PgPool,
    id: i64,
    price: Decimal,
    sizes: &[String],
    scraped_at: DateTime<Utc>,
) -> Result<SupplierProductRow, DbError> {
    sqlx::query_as::<_, SupplierProductRow>(&format!(
        "UPDATE supplier_products \
         SET price = $2, sizes = $3, last_scraped = $4 \
         WHERE id = $1 \
         RETURNING {SUPPLIER_PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .bind(price)
    .bind(sizes)
    .bind(scraped_at)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

fn into_records(rows: Vec<SupplierProductRow>) -> Vec<SupplierRecord> {
    rows.into_iter().map(SupplierRecord::from).collect()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// [`SupplierStore`] over the `supplier_products` table.
#[derive(Debug, Clone)]
pub struct PgSupplierStore {
    pool: PgPool,
}

impl PgSupplierStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SupplierStore for PgSupplierStore {
    async fn get_supplier_product(&self, id: i64) -> Result<SupplierRecord, StoreError> {
        get_supplier_product(&self.pool, id)
            .await
            .map(SupplierRecord::from)
            .map_err(|e| e.into_store_error(ENTITY, id))
    }

    async fn list_for_product(&self, product_id: i64) -> Result<Vec<SupplierRecord>, StoreError> {
        Ok(into_records(
            list_supplier_products_for_product(&self.pool, product_id).await?,
        ))
    }

    async fn list_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<SupplierRecord>, StoreError> {
        Ok(into_records(
            list_stale_supplier_products(&self.pool, cutoff).await?,
        ))
    }

    async fn list_stale_for_product(
        &self,
        product_id: i64,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SupplierRecord>, StoreError> {
        Ok(into_records(
            list_stale_supplier_products_for_product(&self.pool, product_id, cutoff).await?,
        ))
    }

    async fn apply_scrape(
        &self,
        id: i64,
        result: &ScrapeResult,
        scraped_at: DateTime<Utc>,
    ) -> Result<SupplierRecord, StoreError> {
        apply_scrape(&self.pool, id, result.price(), result.sizes(), scraped_at)
            .await
            .map(SupplierRecord::from)
            .map_err(|e| e.into_store_error(ENTITY, id))
    }
}
