use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_PRODUCT_LINK_BASE: &str = "https://onlinebazaar4u.com/product";
pub const DEFAULT_WEBHOOK_URL: &str = "http://localhost:5000/api/feeds/f";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
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
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the process environment so tests
/// can drive them from a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Blank values count as unset so `.env` templates can leave keys empty.
    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let root_path = PathBuf::from(require("FEEDGEN_ROOT_PATH")?);
    let env = parse_environment(&or_default("FEEDGEN_ENV", "development"))?;
    let log_level = or_default("FEEDGEN_LOG_LEVEL", "info");
    let placements_path = PathBuf::from(or_default(
        "FEEDGEN_PLACEMENTS_PATH",
        "./config/placements.yaml",
    ));

    let publisher_id = optional("CNX_PUBLISHER_ID");
    let api_key = optional("CNX_API_KEY");

    let http_timeout_secs = parse_u64("FEEDGEN_HTTP_TIMEOUT_SECS", "300")?;
    let user_agent = or_default("FEEDGEN_USER_AGENT", "feedgen/0.1 (feed-regeneration)");
    let product_link_base = or_default("FEEDGEN_PRODUCT_LINK_BASE", DEFAULT_PRODUCT_LINK_BASE)
        .trim_end_matches('/')
        .to_string();
    let webhook_url = match lookup("FEEDGEN_WEBHOOK_URL") {
        Ok(v) if v.trim().is_empty() => None,
        Ok(v) => Some(v),
        Err(_) => Some(DEFAULT_WEBHOOK_URL.to_string()),
    };
    let upload_dir = optional("FEEDGEN_UPLOAD_DIR").map(PathBuf::from);
    let upload_url = optional("FEEDGEN_UPLOAD_URL");

    let database_url = optional("DATABASE_URL");
    let db_max_connections = parse_u32("FEEDGEN_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("FEEDGEN_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("FEEDGEN_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        env,
        log_level,
        root_path,
        placements_path,
        publisher_id,
        api_key,
        http_timeout_secs,
        user_agent,
        product_link_base,
        webhook_url,
        upload_dir,
        upload_url,
        database_url,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FEEDGEN_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
