#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub search_url: String,
    pub user_agent: String,
    pub accept_language: String,
    pub request_timeout_ms: u64,
    pub max_pages: u32,
    pub results_per_page: u32,
    pub max_rank: u32,
    pub concurrency: usize,
    pub rate_interval_ms: u64,
    pub rate_interval_cap: u32,
    pub cache_ttl_secs: u64,
    pub cache_sweep_secs: u64,
    pub breaker_failure_threshold: u32,
    pub breaker_success_threshold: u32,
    pub breaker_reset_timeout_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub retry_jitter_ms: u64,
    pub keyword_min_length: usize,
    pub keyword_max_length: usize,
    pub keyword_max_results: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("search_url", &self.search_url)
            .field("user_agent", &self.user_agent)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("max_pages", &self.max_pages)
            .field("results_per_page", &self.results_per_page)
            .field("max_rank", &self.max_rank)
            .field("concurrency", &self.concurrency)
            .field(
                "rate_limit",
                &format_args!(
                    "{} per {}ms",
                    self.rate_interval_cap, self.rate_interval_ms
                ),
            )
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("cache_sweep_secs", &self.cache_sweep_secs)
            .field(
                "breaker",
                &format_args!(
                    "open after {} failures, close after {} successes, reset {}s",
                    self.breaker_failure_threshold,
                    self.breaker_success_threshold,
                    self.breaker_reset_timeout_secs
                ),
            )
            .field("retry_max_attempts", &self.retry_max_attempts)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("retry_max_delay_ms", &self.retry_max_delay_ms)
            .field("retry_jitter_ms", &self.retry_jitter_ms)
            .field(
                "keyword_length",
                &format_args!("{}..={}", self.keyword_min_length, self.keyword_max_length),
            )
            .field("keyword_max_results", &self.keyword_max_results)
            .finish()
    }
}

impl AppConfig {
    /// Combinator bounds from `KWRANK_MIN_LENGTH`, `KWRANK_MAX_LENGTH` and `KWRANK_MAX_RESULTS`.
    #[must_use]
    pub fn combinator_options(&self) -> crate::CombinatorOptions {
        crate::CombinatorOptions {
            min_length: self.keyword_min_length,
            max_length: self.keyword_max_length,
            max_results: self.keyword_max_results,
            ..crate::CombinatorOptions::default()
        }
    }
}
