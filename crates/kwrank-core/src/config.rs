use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_SEARCH_URL: &str = "https://m.place.naver.com/restaurant/list";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X) AppleWebKit/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but malformed, or if the
/// resulting values are inconsistent.
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
/// Returns `ConfigError` if a variable is present but malformed, or if the
/// resulting values are inconsistent.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable is optional. Parsing is decoupled from the real environment
/// so tests can drive it with a plain `HashMap`.
///
/// # Errors
///
/// Same as [`load_app_config`].
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let env = parse_environment(&or_default("KWRANK_ENV", "development"))?;
    let log_level = or_default("KWRANK_LOG_LEVEL", "info");
    let search_url = or_default("KWRANK_SEARCH_URL", DEFAULT_SEARCH_URL);
    let user_agent = or_default("KWRANK_USER_AGENT", DEFAULT_USER_AGENT);
    let accept_language = or_default("KWRANK_ACCEPT_LANGUAGE", "ko-KR,ko;q=0.9");

    let request_timeout_ms = parse_var(&lookup, "KWRANK_REQUEST_TIMEOUT_MS", 10_000u64)?;
    let max_pages = parse_var(&lookup, "KWRANK_MAX_PAGES", 2u32)?;
    let results_per_page = parse_var(&lookup, "KWRANK_RESULTS_PER_PAGE", 15u32)?;
    let max_rank = parse_var(&lookup, "KWRANK_MAX_RANK", 5u32)?;
    let concurrency = parse_var(&lookup, "KWRANK_CONCURRENCY", 10usize)?;
    let rate_interval_ms = parse_var(&lookup, "KWRANK_RATE_INTERVAL_MS", 1_000u64)?;
    let rate_interval_cap = parse_var(&lookup, "KWRANK_RATE_INTERVAL_CAP", 20u32)?;
    let cache_ttl_secs = parse_var(&lookup, "KWRANK_CACHE_TTL_SECS", 3_600u64)?;
    let cache_sweep_secs = parse_var(&lookup, "KWRANK_CACHE_SWEEP_SECS", 600u64)?;
    let breaker_failure_threshold = parse_var(&lookup, "KWRANK_BREAKER_FAILURE_THRESHOLD", 5u32)?;
    let breaker_success_threshold = parse_var(&lookup, "KWRANK_BREAKER_SUCCESS_THRESHOLD", 2u32)?;
    let breaker_reset_timeout_secs =
        parse_var(&lookup, "KWRANK_BREAKER_RESET_TIMEOUT_SECS", 60u64)?;
    let retry_max_attempts = parse_var(&lookup, "KWRANK_RETRY_MAX_ATTEMPTS", 3u32)?;
    let retry_base_delay_ms = parse_var(&lookup, "KWRANK_RETRY_BASE_DELAY_MS", 1_000u64)?;
    let retry_max_delay_ms = parse_var(&lookup, "KWRANK_RETRY_MAX_DELAY_MS", 30_000u64)?;
    let retry_jitter_ms = parse_var(&lookup, "KWRANK_RETRY_JITTER_MS", 250u64)?;
    let keyword_min_length = parse_var(&lookup, "KWRANK_MIN_LENGTH", 6usize)?;
    let keyword_max_length = parse_var(&lookup, "KWRANK_MAX_LENGTH", 15usize)?;
    let keyword_max_results = parse_var(&lookup, "KWRANK_MAX_RESULTS", 500usize)?;

    let config = AppConfig {
        env,
        log_level,
        search_url,
        user_agent,
        accept_language,
        request_timeout_ms,
        max_pages,
        results_per_page,
        max_rank,
        concurrency,
        rate_interval_ms,
        rate_interval_cap,
        cache_ttl_secs,
        cache_sweep_secs,
        breaker_failure_threshold,
        breaker_success_threshold,
        breaker_reset_timeout_secs,
        retry_max_attempts,
        retry_base_delay_ms,
        retry_max_delay_ms,
        retry_jitter_ms,
        keyword_min_length,
        keyword_max_length,
        keyword_max_results,
    };
    validate(&config)?;
    Ok(config)
}

/// Parses `var` into `T`, falling back to `default` when the variable is unset.
fn parse_var<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(default),
    }
}

/// Cross-field checks that individual parsers cannot express.
fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    let positive = [
        ("KWRANK_CONCURRENCY", config.concurrency == 0),
        ("KWRANK_MAX_PAGES", config.max_pages == 0),
        ("KWRANK_RESULTS_PER_PAGE", config.results_per_page == 0),
        ("KWRANK_RATE_INTERVAL_MS", config.rate_interval_ms == 0),
        ("KWRANK_RATE_INTERVAL_CAP", config.rate_interval_cap == 0),
        ("KWRANK_CACHE_SWEEP_SECS", config.cache_sweep_secs == 0),
        (
            "KWRANK_BREAKER_FAILURE_THRESHOLD",
            config.breaker_failure_threshold == 0,
        ),
        (
            "KWRANK_BREAKER_SUCCESS_THRESHOLD",
            config.breaker_success_threshold == 0,
        ),
        ("KWRANK_RETRY_MAX_ATTEMPTS", config.retry_max_attempts == 0),
    ];
    if let Some((var, _)) = positive.iter().find(|(_, is_zero)| *is_zero) {
        return Err(ConfigError::InvalidValue(format!(
            "{var} must be greater than zero"
        )));
    }

    if config.keyword_min_length > config.keyword_max_length {
        return Err(ConfigError::InvalidValue(format!(
            "KWRANK_MIN_LENGTH ({}) exceeds KWRANK_MAX_LENGTH ({})",
            config.keyword_min_length, config.keyword_max_length
        )));
    }

    if config.retry_base_delay_ms > config.retry_max_delay_ms {
        return Err(ConfigError::InvalidValue(format!(
            "KWRANK_RETRY_BASE_DELAY_MS ({}) exceeds KWRANK_RETRY_MAX_DELAY_MS ({})",
            config.retry_base_delay_ms, config.retry_max_delay_ms
        )));
    }

    Ok(())
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "KWRANK_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
