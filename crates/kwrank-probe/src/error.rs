use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("connection to {url} failed: {message}")]
    Connection { url: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("state marker not found in response from {url}")]
    StateMarkerMissing { url: String },

    #[error("embedded state in response from {url} is not a balanced object")]
    UnbalancedState { url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("circuit breaker open, retry in {retry_in_ms}ms")]
    BreakerOpen { retry_in_ms: u64 },

    #[error("invalid search URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid state marker \"{marker}\": {reason}")]
    InvalidMarker { marker: String, reason: String },
}

impl ProbeError {
    /// Returns `true` for transient transport failures worth another attempt.
    ///
    /// Status, parse, and breaker errors are not retryable: another attempt
    /// would see the same response or the same open circuit.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ProbeError::Timeout { .. } | ProbeError::Connection { .. } => true,
            ProbeError::Http(err) => err.is_timeout() || err.is_connect(),
            ProbeError::UnexpectedStatus { .. }
            | ProbeError::StateMarkerMissing { .. }
            | ProbeError::UnbalancedState { .. }
            | ProbeError::Deserialize { .. }
            | ProbeError::BreakerOpen { .. }
            | ProbeError::InvalidUrl { .. }
            | ProbeError::InvalidMarker { .. } => false,
        }
    }
}
