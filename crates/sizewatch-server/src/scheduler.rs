//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! periodic stale supplier-product refresh.

use std::sync::Arc;

use chrono::Utc;
use sizewatch_core::AppConfig;
use sizewatch_scraper::{BatchReport, Refresher};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the refresh schedule does not parse, or the scheduler fails to start.
pub async fn build_scheduler(
    refresher: Refresher,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_refresh_job(&scheduler, refresher, config).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Registers the stale refresh on `SIZEWATCH_REFRESH_CRON`.
async fn register_refresh_job(
    scheduler: &JobScheduler,
    refresher: Refresher,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let schedule = config.refresh_cron.clone();

    let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
        let refresher = refresher.clone();
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting stale supplier-product refresh");
            if let Some(report) = run_refresh_job(&refresher, &config).await {
                tracing::info!(
                    updated = report.updated.len(),
                    unsupported = report.unsupported.len(),
                    failed = report.failed.len(),
                    pool_exhausted = report.pool_exhausted,
                    "scheduler: stale refresh complete"
                );
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(schedule = %schedule, "scheduler: stale refresh registered");
    Ok(())
}

/// One crawl session: clears proxy failure counters, then refreshes every
/// record older than the staleness window. `None` when the run could not
/// start.
async fn run_refresh_job(refresher: &Refresher, config: &AppConfig) -> Option<BatchReport> {
    if let Err(e) = refresher.session().begin().await {
        tracing::error!(error = %e, "scheduler: could not reset proxy failure counts");
        return None;
    }

    let cutoff = Utc::now() - config.stale_after();
    match refresher.refresh_stale(cutoff, config.batch_policy).await {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!(error = %e, "scheduler: could not list stale supplier products");
            None
        }
    }
}
