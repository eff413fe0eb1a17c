//! Refresh command handlers.
//!
//! Batch commands log and skip individual failures; the run only fails when
//! nothing could be refreshed or the proxy pool ran dry.

use std::sync::Arc;

use chrono::Utc;
use clap::Subcommand;
use sizewatch_core::{AppConfig, BatchPolicy, SupplierRecord};
use sizewatch_db::{PgProxyStore, PgSupplierStore};
use sizewatch_scraper::{
    BatchReport, FetchConfig, Fetcher, PoolSettings, ProxyPool, RefreshOutcome, Refresher,
    Registry, Session,
};

/// Sub-commands available under `refresh`.
#[derive(Debug, Subcommand)]
pub enum RefreshCommands {
    /// Re-scrape one supplier product by id
    Record { id: i64 },
    /// Re-scrape a product's stale supplier products
    Product {
        id: i64,
        /// Include records inside the staleness window
        #[arg(long)]
        all: bool,
        /// Stop at the first failed record
        #[arg(long)]
        fail_fast: bool,
    },
    /// Re-scrape every stale supplier product, starting a fresh proxy session
    Stale {
        /// Stop at the first failed record
        #[arg(long)]
        fail_fast: bool,
    },
}

fn build_refresher(pool: &sqlx::PgPool, config: &AppConfig) -> anyhow::Result<Refresher> {
    let fetcher = Fetcher::new(FetchConfig::from_app_config(config))?;
    let proxies = ProxyPool::new(
        Arc::new(PgProxyStore::new(pool.clone())),
        PoolSettings::from_app_config(config),
    );
    Ok(Refresher::new(
        Arc::new(Registry::with_default_retailers()),
        Session::new(Arc::new(fetcher), proxies),
        Arc::new(PgSupplierStore::new(pool.clone())),
    ))
}

fn policy(config: &AppConfig, fail_fast: bool) -> BatchPolicy {
    if fail_fast {
        BatchPolicy::FailFast
    } else {
        config.batch_policy
    }
}

pub(crate) async fn run_refresh(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: RefreshCommands,
) -> anyhow::Result<()> {
    let refresher = build_refresher(pool, config)?;

    match command {
        RefreshCommands::Record { id } => match refresher.refresh_record(id).await? {
            RefreshOutcome::Updated(record) => {
                print_header();
                print_record(&record);
            }
            RefreshOutcome::Unsupported(record) => println!(
                "no scraper for retailer '{}'; supplier product {id} left as is",
                record.retailer_name
            ),
        },
        RefreshCommands::Product { id, all, fail_fast } => {
            let cutoff = if all {
                Utc::now()
            } else {
                Utc::now() - config.stale_after()
            };
            let report = refresher
                .refresh_product(id, cutoff, policy(config, fail_fast))
                .await?;
            finish_batch(&report)?;
        }
        RefreshCommands::Stale { fail_fast } => {
            refresher.session().begin().await?;
            let cutoff = Utc::now() - config.stale_after();
            let report = refresher
                .refresh_stale(cutoff, policy(config, fail_fast))
                .await?;
            finish_batch(&report)?;
        }
    }

    Ok(())
}

/// Prints `report` and turns a batch with nothing to show for it into an
/// error.
fn finish_batch(report: &BatchReport) -> anyhow::Result<()> {
    if report.attempted() == 0 {
        println!("no stale supplier products found");
        return Ok(());
    }

    let records = report.records();
    if !records.is_empty() {
        print_header();
        for record in &records {
            print_record(record);
        }
    }
    for failure in &report.failed {
        println!("FAILED {:<8}{}", failure.supplier_product_id, failure.message);
    }
    println!("{}", summary(report));

    if report.pool_exhausted {
        anyhow::bail!("proxy pool exhausted; remaining supplier products were not refreshed");
    }
    if report.all_failed() {
        anyhow::bail!(
            "all {} attempted supplier products failed to refresh",
            report.failed.len()
        );
    }
    Ok(())
}

fn summary(report: &BatchReport) -> String {
    let mut line = format!(
        "updated {}, unsupported {}, failed {}",
        report.updated.len(),
        report.unsupported.len(),
        report.failed.len()
    );
    if report.aborted {
        line.push_str(" (stopped early)");
    }
    line
}

fn print_header() {
    println!(
        "{:<8}{:<18}{:<10}{:<22}SIZES",
        "ID", "RETAILER", "PRICE", "LAST SCRAPED"
    );
}

fn print_record(record: &SupplierRecord) {
    let price = record
        .price
        .map_or_else(|| "-".to_string(), |p| p.to_string());
    println!(
        "{:<8}{:<18}{:<10}{:<22}{}",
        record.id,
        record.retailer_name,
        price,
        record.last_scraped.format("%Y-%m-%d %H:%M:%S"),
        record.sizes.join(", ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use sizewatch_scraper::RecordFailure;

    fn failure(id: i64) -> RecordFailure {
        RecordFailure {
            supplier_product_id: id,
            message: "could not extract price".to_string(),
        }
    }

    #[test]
    fn empty_batch_is_not_an_error() {
        assert!(finish_batch(&BatchReport::default()).is_ok());
    }

    #[test]
    fn batch_where_everything_failed_is_an_error() {
        let report = BatchReport {
            failed: vec![failure(1), failure(2)],
            ..BatchReport::default()
        };
        let err = finish_batch(&report).unwrap_err();
        assert!(err.to_string().contains("all 2 attempted"));
    }

    #[test]
    fn pool_exhaustion_is_an_error() {
        let report = BatchReport {
            failed: vec![failure(1)],
            aborted: true,
            pool_exhausted: true,
            ..BatchReport::default()
        };
        assert!(finish_batch(&report)
            .unwrap_err()
            .to_string()
            .contains("proxy pool exhausted"));
    }

    #[test]
    fn summary_notes_early_stop() {
        let report = BatchReport {
            failed: vec![failure(4)],
            aborted: true,
            ..BatchReport::default()
        };
        assert_eq!(summary(&report), "updated 0, unsupported 0, failed 1 (stopped early)");
    }

    #[test]
    fn fail_fast_flag_overrides_configured_policy() {
        let mut config = crate::tests::app_config();
        config.batch_policy = BatchPolicy::ContinueOnError;
        assert_eq!(policy(&config, true), BatchPolicy::FailFast);
        assert_eq!(policy(&config, false), BatchPolicy::ContinueOnError);
    }
}
