use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_test() {
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_is_rejected() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "KWRANK_ENV"));
}

#[test]
fn build_app_config_uses_defaults_when_env_is_empty() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.search_url, "https://m.place.naver.com/restaurant/list");
    assert_eq!(cfg.accept_language, "ko-KR,ko;q=0.9");
    assert_eq!(cfg.request_timeout_ms, 10_000);
    assert_eq!(cfg.max_pages, 2);
    assert_eq!(cfg.results_per_page, 15);
    assert_eq!(cfg.max_rank, 5);
    assert_eq!(cfg.concurrency, 10);
    assert_eq!(cfg.rate_interval_ms, 1_000);
    assert_eq!(cfg.rate_interval_cap, 20);
    assert_eq!(cfg.cache_ttl_secs, 3_600);
    assert_eq!(cfg.cache_sweep_secs, 600);
    assert_eq!(cfg.breaker_failure_threshold, 5);
    assert_eq!(cfg.breaker_success_threshold, 2);
    assert_eq!(cfg.breaker_reset_timeout_secs, 60);
    assert_eq!(cfg.retry_max_attempts, 3);
    assert_eq!(cfg.retry_base_delay_ms, 1_000);
    assert_eq!(cfg.retry_max_delay_ms, 30_000);
    assert_eq!(cfg.retry_jitter_ms, 250);
    assert_eq!(cfg.keyword_min_length, 6);
    assert_eq!(cfg.keyword_max_length, 15);
    assert_eq!(cfg.keyword_max_results, 500);
}

#[test]
fn build_app_config_applies_overrides() {
    let mut map = HashMap::new();
    map.insert("KWRANK_ENV", "production");
    map.insert("KWRANK_CONCURRENCY", "4");
    map.insert("KWRANK_MAX_RANK", " 10 ");
    map.insert("KWRANK_USER_AGENT", "custom-agent/2.0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Production);
    assert_eq!(cfg.concurrency, 4);
    assert_eq!(cfg.max_rank, 10);
    assert_eq!(cfg.user_agent, "custom-agent/2.0");
}

#[test]
fn build_app_config_rejects_non_numeric_timeout() {
    let mut map = HashMap::new();
    map.insert("KWRANK_REQUEST_TIMEOUT_MS", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "KWRANK_REQUEST_TIMEOUT_MS"),
        "expected InvalidEnvVar(KWRANK_REQUEST_TIMEOUT_MS), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_negative_concurrency() {
    let mut map = HashMap::new();
    map.insert("KWRANK_CONCURRENCY", "-1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "KWRANK_CONCURRENCY"),
        "expected InvalidEnvVar(KWRANK_CONCURRENCY), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_concurrency() {
    let mut map = HashMap::new();
    map.insert("KWRANK_CONCURRENCY", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidValue(ref msg)) if msg.contains("KWRANK_CONCURRENCY")),
        "expected InvalidValue mentioning KWRANK_CONCURRENCY, got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_inverted_length_bounds() {
    let mut map = HashMap::new();
    map.insert("KWRANK_MIN_LENGTH", "20");
    map.insert("KWRANK_MAX_LENGTH", "10");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidValue(ref msg)) if msg.contains("KWRANK_MIN_LENGTH")),
        "expected InvalidValue for inverted bounds, got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_base_delay_above_max_delay() {
    let mut map = HashMap::new();
    map.insert("KWRANK_RETRY_BASE_DELAY_MS", "5000");
    map.insert("KWRANK_RETRY_MAX_DELAY_MS", "1000");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
}

#[test]
fn debug_output_summarises_rate_limit() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(debug.contains("20 per 1000ms"), "got: {debug}");
}

#[test]
fn combinator_options_follow_length_vars() {
    let mut map = HashMap::new();
    map.insert("KWRANK_MIN_LENGTH", "2");
    map.insert("KWRANK_MAX_RESULTS", "50");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let options = cfg.combinator_options();
    assert_eq!(options.min_length, 2);
    assert_eq!(options.max_length, 15);
    assert_eq!(options.max_results, 50);
    assert_eq!(options.max_fragments_per_category, 20);
}
