pub mod circuit_breaker;
pub mod error;
pub mod fetch;
pub mod probe;
pub mod retry;
pub mod state;

pub use circuit_breaker::{BreakerConfig, BreakerSnapshot, BreakerState, CircuitBreaker};
pub use error::ProbeError;
pub use fetch::{FetchRequest, FetchResponse, Fetcher, HttpFetcher};
pub use probe::{ProbeConfig, ProbeOutcome, ProbeReport, RankProbe};
pub use retry::RetryPolicy;
pub use state::{extract_balanced_object, find_rank_in_state, StateExtractor};
