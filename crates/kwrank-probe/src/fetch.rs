//! The network boundary: one request in, status and body out.
//!
//! Nothing here retries or consults the circuit breaker; callers compose
//! those around [`Fetcher::fetch`].

use std::future::Future;
use std::time::Duration;

use reqwest::Client;

use crate::error::ProbeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single GET.
///
/// Implementations report transport failures as [`ProbeError::Timeout`] or
/// [`ProbeError::Connection`] so the retry policy can recognise them.
pub trait Fetcher: Send + Sync {
    fn fetch(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<FetchResponse, ProbeError>> + Send;
}

/// [`Fetcher`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher whose client enforces `connect_timeout` on every
    /// connection. The per-request timeout comes from each [`FetchRequest`].
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(connect_timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ProbeError> {
        let FetchRequest {
            url,
            headers,
            timeout,
        } = request;

        let mut builder = self.client.get(&url).timeout(timeout);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| classify_transport_error(&url, err))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| classify_transport_error(&url, err))?;

        tracing::trace!(url = %url, status, bytes = body.len(), "fetched page");
        Ok(FetchResponse { status, body })
    }
}

fn classify_transport_error(url: &str, err: reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout {
            url: url.to_owned(),
        }
    } else if err.is_connect() {
        ProbeError::Connection {
            url: url.to_owned(),
            message: err.to_string(),
        }
    } else {
        ProbeError::Http(err)
    }
}
