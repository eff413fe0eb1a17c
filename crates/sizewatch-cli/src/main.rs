mod proxies;
mod refresh;
mod scrape;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::proxies::ProxiesCommands;
use crate::refresh::RefreshCommands;

#[derive(Debug, Parser)]
#[command(name = "sizewatch-cli")]
#[command(about = "Retailer price and size tracking")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape one product page and print its price and sizes (no database)
    Scrape {
        /// Retailer name, e.g. "Sports Direct" or "sportsdirect"
        retailer: String,
        /// Product page URL
        url: String,
        /// Route requests through this proxy (`[user:pass@]host:port`); repeatable
        #[arg(long = "proxy", value_name = "PROXY")]
        proxies: Vec<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-scrape supplier products and write the results back
    Refresh {
        #[command(subcommand)]
        command: RefreshCommands,
    },
    /// Inspect or reset the proxy pool
    Proxies {
        #[command(subcommand)]
        command: ProxiesCommands,
    },
    /// List the retailers a scraper is registered for
    Retailers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = sizewatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Scrape {
            retailer,
            url,
            proxies,
            json,
        }) => scrape::run_scrape(&config, &retailer, &url, &proxies, json).await?,
        Some(Commands::Refresh { command }) => {
            let pool = connect(&config).await?;
            refresh::run_refresh(&pool, &config, command).await?;
        }
        Some(Commands::Proxies { command }) => {
            let pool = connect(&config).await?;
            proxies::run_proxies(&pool, &config, command).await?;
        }
        Some(Commands::Retailers) => {
            for key in sizewatch_scraper::Registry::with_default_retailers().supported() {
                println!("{key}");
            }
        }
        None => println!("no command given; run `sizewatch-cli --help`"),
    }

    Ok(())
}

/// Connects to `DATABASE_URL` and applies pending migrations.
async fn connect(config: &sizewatch_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = sizewatch_db::PoolConfig::from_app_config(config);
    let pool = sizewatch_db::connect_pool(config.require_database_url()?, pool_config).await?;
    let applied = sizewatch_db::run_migrations(&pool).await?;
    tracing::debug!(applied, "migrations checked");
    Ok(pool)
}
