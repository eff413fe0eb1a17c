use crate::app_config::{AppConfig, BatchPolicy, Environment};
use crate::proxies::ProxyMode;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = lookup("DATABASE_URL").ok().filter(|s| !s.is_empty());
    let env = parse_environment(&or_default("SIZEWATCH_ENV", "development"))?;

    let bind_addr = or_default("SIZEWATCH_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("SIZEWATCH_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("SIZEWATCH_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("SIZEWATCH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("SIZEWATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("SIZEWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let fetch_timeout_ms = parse_u64("SIZEWATCH_FETCH_TIMEOUT_MS", "3000")?;
    let fetch_max_attempts = parse_u32("SIZEWATCH_FETCH_MAX_ATTEMPTS", "3")?;
    if fetch_max_attempts == 0 {
        return Err(invalid(
            "SIZEWATCH_FETCH_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    let fetch_retry_min_ms = parse_u64("SIZEWATCH_FETCH_RETRY_MIN_MS", "1000")?;
    let fetch_retry_max_ms = parse_u64("SIZEWATCH_FETCH_RETRY_MAX_MS", "2000")?;
    if fetch_retry_max_ms < fetch_retry_min_ms {
        return Err(invalid(
            "SIZEWATCH_FETCH_RETRY_MAX_MS",
            format!("must not be below SIZEWATCH_FETCH_RETRY_MIN_MS ({fetch_retry_min_ms})"),
        ));
    }

    let user_agents = lookup("SIZEWATCH_USER_AGENTS")
        .ok()
        .map(|raw| parse_user_agents(&raw));

    let proxy_max_fails = parse_u32("SIZEWATCH_PROXY_MAX_FAILS", "5")?;
    let proxy_mode = or_default("SIZEWATCH_PROXY_MODE", "preferred")
        .parse::<ProxyMode>()
        .map_err(|e| invalid("SIZEWATCH_PROXY_MODE", e))?;

    let stale_after_secs = parse_u64("SIZEWATCH_STALE_AFTER_SECS", "10800")?;
    let batch_policy = or_default("SIZEWATCH_BATCH_POLICY", "continue")
        .parse::<BatchPolicy>()
        .map_err(|e| invalid("SIZEWATCH_BATCH_POLICY", e))?;
    let refresh_cron = or_default("SIZEWATCH_REFRESH_CRON", "0 */30 * * * *");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fetch_timeout_ms,
        fetch_max_attempts,
        fetch_retry_min_ms,
        fetch_retry_max_ms,
        user_agents,
        proxy_max_fails,
        proxy_mode,
        stale_after_secs,
        batch_policy,
        refresh_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unknown environment names.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SIZEWATCH_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Splits a `|`-separated user-agent list. User agents contain commas and
/// semicolons, so neither can be the separator.
fn parse_user_agents(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
