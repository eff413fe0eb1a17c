mod api;
mod middleware;
mod scheduler;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use sizewatch_db::{PgProxyStore, PgSupplierStore};
use sizewatch_scraper::{FetchConfig, Fetcher, PoolSettings, ProxyPool, Refresher, Registry, Session};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, default_rate_limit_state, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(sizewatch_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = sizewatch_db::PoolConfig::from_app_config(&config);
    let pool = sizewatch_db::connect_pool(config.require_database_url()?, pool_config).await?;
    sizewatch_db::run_migrations(&pool).await?;

    let fetcher = Arc::new(Fetcher::new(FetchConfig::from_app_config(&config))?);
    let proxies = ProxyPool::new(
        Arc::new(PgProxyStore::new(pool.clone())),
        PoolSettings::from_app_config(&config),
    );
    let registry = Arc::new(Registry::with_default_retailers());
    tracing::info!(retailers = registry.supported().len(), "scraper registry loaded");

    let refresher = Refresher::new(
        registry,
        Session::new(fetcher, proxies),
        Arc::new(PgSupplierStore::new(pool.clone())),
    );

    let _scheduler = scheduler::build_scheduler(refresher.clone(), Arc::clone(&config)).await?;

    let app = build_app(
        AppState {
            pool,
            refresher,
            config: Arc::clone(&config),
        },
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
