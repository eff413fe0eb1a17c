use clap::Subcommand;
use sizewatch_core::{AppConfig, ProxyEndpoint};

/// Sub-commands available under `proxies`.
#[derive(Debug, Subcommand)]
pub enum ProxiesCommands {
    /// Show every proxy with its failure count
    List,
    /// Clear every proxy's failure count
    Reset,
}

pub(crate) async fn run_proxies(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: ProxiesCommands,
) -> anyhow::Result<()> {
    match command {
        ProxiesCommands::List => {
            let rows = sizewatch_db::list_proxies(pool).await?;
            if rows.is_empty() {
                println!("no proxies configured");
                return Ok(());
            }
            println!("{:<24}{:<8}{:<6}{:<7}STATUS", "HOST", "PORT", "AUTH", "FAILS");
            for row in rows {
                let endpoint = ProxyEndpoint::try_from(row)?;
                println!("{}", proxy_line(&endpoint, config.proxy_max_fails));
            }
        }
        ProxiesCommands::Reset => {
            let reset = sizewatch_db::reset_proxy_fail_counts(pool).await?;
            println!("reset failure counts on {reset} proxies");
        }
    }
    Ok(())
}

fn proxy_line(endpoint: &ProxyEndpoint, max_fails: u32) -> String {
    let auth = if endpoint.credentials().is_some() { "yes" } else { "no" };
    let status = if endpoint.fail_count >= max_fails {
        "blacklisted"
    } else {
        "active"
    };
    format!(
        "{:<24}{:<8}{:<6}{:<7}{}",
        endpoint.host, endpoint.port, auth, endpoint.fail_count, status
    )
}
