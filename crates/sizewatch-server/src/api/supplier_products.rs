use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sizewatch_core::{BatchPolicy, SupplierRecord};
use sizewatch_scraper::{BatchReport, RecordFailure};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SupplierProductItem {
    id: i64,
    product_id: i64,
    retailer_name: String,
    url: String,
    price: Option<Decimal>,
    sizes: Vec<String>,
    last_scraped: DateTime<Utc>,
    /// `false` when no scraper handles the retailer and the record was
    /// returned as stored.
    refreshed: bool,
}

impl SupplierProductItem {
    fn from_record(record: SupplierRecord, refreshed: bool) -> Self {
        Self {
            id: record.id,
            product_id: record.product_id,
            retailer_name: record.retailer_name,
            url: record.url,
            price: record.price,
            sizes: record.sizes,
            last_scraped: record.last_scraped,
            refreshed,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct FailureItem {
    supplier_product_id: i64,
    message: String,
}

impl From<RecordFailure> for FailureItem {
    fn from(failure: RecordFailure) -> Self {
        Self {
            supplier_product_id: failure.supplier_product_id,
            message: failure.message,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshData {
    product_id: i64,
    supplier_products: Vec<SupplierProductItem>,
    failures: Vec<FailureItem>,
}

/// Decides whether a finished batch is reported as an error, returning the
/// error code and message.
fn batch_error(report: &BatchReport, policy: BatchPolicy) -> Option<(&'static str, String)> {
    let first = report.failed.first()?;
    if report.pool_exhausted {
        return Some(("service_unavailable", first.message.clone()));
    }
    if policy == BatchPolicy::FailFast || report.all_failed() {
        return Some(("not_found", first.message.clone()));
    }
    None
}

/// `POST /api/v1/products/{product_id}/supplierproducts`
///
/// Re-scrapes the product's supplier records that are older than the
/// staleness window and returns their stored state.
pub(super) async fn refresh_supplier_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<RefreshData>>, ApiError> {
    let policy = state.config.batch_policy;
    let cutoff = Utc::now() - state.config.stale_after();

    let report = state
        .refresher
        .refresh_product(product_id, cutoff, policy)
        .await
        .map_err(|e| {
            tracing::error!(product_id, error = %e, "could not list supplier products");
            ApiError::new(req_id.0.clone(), "internal_error", "supplier products unavailable")
        })?;

    if let Some((code, message)) = batch_error(&report, policy) {
        tracing::warn!(
            product_id,
            failed = report.failed.len(),
            updated = report.updated.len(),
            code,
            "supplier product refresh rejected"
        );
        return Err(ApiError::new(req_id.0, code, message));
    }

    let BatchReport {
        updated,
        unsupported,
        failed,
        ..
    } = report;
    let supplier_products = updated
        .into_iter()
        .map(|r| SupplierProductItem::from_record(r, true))
        .chain(
            unsupported
                .into_iter()
                .map(|r| SupplierProductItem::from_record(r, false)),
        )
        .collect();

    Ok(Json(ApiResponse {
        data: RefreshData {
            product_id,
            supplier_products,
            failures: failed.into_iter().map(FailureItem::from).collect(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
