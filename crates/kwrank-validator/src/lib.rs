pub mod cache;
pub mod error;
pub mod scheduler;
pub mod types;
pub mod validator;

pub use cache::{CacheConfig, CacheEntry, CacheStats, ResultCache};
pub use error::ValidationError;
pub use scheduler::{
    rate_limiter, Progress, Scheduler, SchedulerConfig, SchedulerStats, SharedLimiter, StopSignal,
};
pub use types::{BatchOptions, BatchOutcome, BatchRequest, ValidationEvent, ValidationResult};
pub use validator::{RankValidator, ValidatorConfig};
