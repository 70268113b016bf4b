use crate::app_config::{AppConfig, Environment};
use crate::places::ProviderKind;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files, which suits tests
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup without `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
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

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid(var, format!("must be a positive number, got {value}")));
        }
        Ok(value)
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let env = parse_environment(&or_default("SCOUT_ENV", "development"))?;
    let log_level = or_default("SCOUT_LOG_LEVEL", "info");

    let google_places_api_key = optional("GOOGLE_PLACES_API_KEY");
    let outscraper_api_key = optional("OUTSCRAPER_API_KEY");
    let providers = parse_providers(&or_default("SCOUT_PROVIDERS", "google_places,outscraper"))?;

    let home_region = or_default("SCOUT_HOME_REGION", "GB").trim().to_ascii_uppercase();
    if home_region.len() != 2 || !home_region.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid(
            "SCOUT_HOME_REGION",
            format!("expected a two-letter ISO region code, got '{home_region}'"),
        ));
    }

    let request_timeout_secs = parse_u64("SCOUT_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("SCOUT_USER_AGENT", "scout/0.1 (business-discovery)");
    let max_retries = parse_u32("SCOUT_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("SCOUT_RETRY_BACKOFF_BASE_MS", "500")?;
    let max_concurrent_requests = parse_usize("SCOUT_MAX_CONCURRENT_REQUESTS", "10")?;
    let sub_region_timeout_secs = parse_u64("SCOUT_SUB_REGION_TIMEOUT_SECS", "45")?;

    let scatter_dense_threshold_miles =
        parse_positive_f64("SCOUT_SCATTER_DENSE_THRESHOLD_MILES", "100")?;
    let direct_tolerance = parse_positive_f64("SCOUT_DIRECT_TOLERANCE", "1.2")?;
    let scatter_tolerance = parse_positive_f64("SCOUT_SCATTER_TOLERANCE", "1.0")?;
    let fallback_tolerance = parse_positive_f64("SCOUT_FALLBACK_TOLERANCE", "1.1")?;
    let fallback_limit = parse_u32("SCOUT_FALLBACK_LIMIT", "20")?;

    let max_pages = parse_u32("SCOUT_MAX_PAGES", "3")?;
    let inter_page_delay_ms = parse_u64("SCOUT_INTER_PAGE_DELAY_MS", "2000")?;
    let require_resolved_location = parse_bool("SCOUT_REQUIRE_RESOLVED_LOCATION", "true")?;

    let cache_ttl_secs = parse_u64("SCOUT_CACHE_TTL_SECS", "604800")?;
    let cache_dir = optional("SCOUT_CACHE_DIR").map(PathBuf::from);

    Ok(AppConfig {
        env,
        log_level,
        google_places_api_key,
        outscraper_api_key,
        providers,
        home_region,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        max_concurrent_requests,
        sub_region_timeout_secs,
        scatter_dense_threshold_miles,
        direct_tolerance,
        scatter_tolerance,
        fallback_tolerance,
        fallback_limit,
        max_pages,
        inter_page_delay_ms,
        require_resolved_location,
        cache_ttl_secs,
        cache_dir,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SCOUT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Parse the comma-separated primary provider chain.
///
/// Order is preserved and duplicates are dropped. The legacy nearby endpoint
/// is a resilience fallback, not a primary provider, so it is rejected here.
fn parse_providers(raw: &str) -> Result<Vec<ProviderKind>, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar {
        var: "SCOUT_PROVIDERS".to_string(),
        reason,
    };

    let mut providers = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind = name.parse::<ProviderKind>().map_err(invalid)?;
        if kind == ProviderKind::GoogleNearby {
            return Err(invalid(
                "google_nearby is only used as the legacy fallback".to_string(),
            ));
        }
        if !providers.contains(&kind) {
            providers.push(kind);
        }
    }

    if providers.is_empty() {
        return Err(invalid("at least one provider is required".to_string()));
    }
    Ok(providers)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
