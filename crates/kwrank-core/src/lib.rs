pub mod app_config;
pub mod combinator;
pub mod completeness;
pub mod config;
pub mod harvest;
pub mod keywords;
pub mod place;

pub use app_config::{AppConfig, Environment};
pub use combinator::{CombinatorOptions, KeywordCombinator, TierCounts};
pub use completeness::{
    CompletenessScore, CompletenessScorer, CompletenessWeights, Grade, ManualData, ScoreCategory,
};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use harvest::{harvest_keyword_set, HarvestOptions};
pub use keywords::{normalize_keyword, CandidateKeyword, KeywordFragment, KeywordFragmentSet, Tier};
pub use place::PlaceSnapshot;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid tier: {0}")]
    InvalidTier(String),

    #[error("failed to parse {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
