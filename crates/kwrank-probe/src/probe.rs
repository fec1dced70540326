//! Paged rank lookup for a single keyword.

use std::time::Duration;

use kwrank_core::AppConfig;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ProbeError;
use crate::fetch::{FetchRequest, Fetcher};
use crate::state::{
    find_rank_in_state, result_count, StateExtractor, DEFAULT_LIST_PREFIX, DEFAULT_STATE_MARKER,
};

pub const DEFAULT_SEARCH_URL: &str = "https://m.place.naver.com/restaurant/list";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X) AppleWebKit/537.36";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub search_url: String,
    pub user_agent: String,
    pub accept_language: String,
    pub timeout: Duration,
    pub max_pages: u32,
    pub results_per_page: u32,
    /// Script assignment target holding the page state.
    pub state_marker: String,
    /// Prefix of the `ROOT_QUERY` key holding the result list.
    pub list_prefix: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            accept_language: "ko-KR,ko;q=0.9".to_owned(),
            timeout: Duration::from_millis(10_000),
            max_pages: 2,
            results_per_page: 15,
            state_marker: DEFAULT_STATE_MARKER.to_owned(),
            list_prefix: DEFAULT_LIST_PREFIX.to_owned(),
        }
    }
}

impl ProbeConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            search_url: config.search_url.clone(),
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
            timeout: Duration::from_millis(config.request_timeout_ms),
            max_pages: config.max_pages,
            results_per_page: config.results_per_page,
            ..Self::default()
        }
    }
}

/// Where the target appeared, if anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// 1-based overall rank and the 1-based page it was seen on.
    Found { rank: u32, page: u32 },
    NotFound,
}

impl ProbeOutcome {
    #[must_use]
    pub fn rank(&self) -> Option<u32> {
        match self {
            ProbeOutcome::Found { rank, .. } => Some(*rank),
            ProbeOutcome::NotFound => None,
        }
    }
}

/// Infallible probe result: a failed lookup carries its error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub rank: Option<u32>,
    pub page: Option<u32>,
    pub error: Option<String>,
}

impl ProbeReport {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.rank.is_none() && self.error.is_none()
    }
}

impl From<Result<ProbeOutcome, ProbeError>> for ProbeReport {
    fn from(result: Result<ProbeOutcome, ProbeError>) -> Self {
        match result {
            Ok(ProbeOutcome::Found { rank, page }) => Self {
                rank: Some(rank),
                page: Some(page),
                error: None,
            },
            Ok(ProbeOutcome::NotFound) => Self {
                rank: None,
                page: None,
                error: None,
            },
            Err(err) => Self {
                rank: None,
                page: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Walks search result pages for a keyword looking for one target id.
#[derive(Debug)]
pub struct RankProbe<F> {
    fetcher: F,
    config: ProbeConfig,
    search_url: Url,
    extractor: StateExtractor,
}

impl<F: Fetcher> RankProbe<F> {
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidUrl`] if `config.search_url` does not
    /// parse, or [`ProbeError::InvalidMarker`] for a blank state marker.
    pub fn new(fetcher: F, config: ProbeConfig) -> Result<Self, ProbeError> {
        let search_url = Url::parse(&config.search_url).map_err(|e| ProbeError::InvalidUrl {
            url: config.search_url.clone(),
            reason: e.to_string(),
        })?;
        let extractor = StateExtractor::new(&config.state_marker)?;
        Ok(Self {
            fetcher,
            config,
            search_url,
            extractor,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Search URL for `keyword` on 1-based `page`.
    #[must_use]
    pub fn page_url(&self, keyword: &str, page: u32) -> String {
        let start = page.saturating_sub(1) * self.config.results_per_page + 1;
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("query", keyword)
            .append_pair("start", &start.to_string());
        url.into()
    }

    /// Looks for `target_id` on up to `max_pages` pages of results for `keyword`.
    ///
    /// The first match wins. A page with an empty result list ends the walk
    /// early since later pages cannot contain the target.
    ///
    /// # Errors
    ///
    /// - [`ProbeError::Timeout`] / [`ProbeError::Connection`] /
    ///   [`ProbeError::Http`]: transport failure from the fetcher.
    /// - [`ProbeError::UnexpectedStatus`]: any non-2xx response.
    /// - [`ProbeError::StateMarkerMissing`], [`ProbeError::UnbalancedState`],
    ///   [`ProbeError::Deserialize`]: the page has no parseable state.
    pub async fn locate(
        &self,
        keyword: &str,
        target_id: &str,
        max_pages: u32,
    ) -> Result<ProbeOutcome, ProbeError> {
        for page in 1..=max_pages {
            let url = self.page_url(keyword, page);
            let response = self
                .fetcher
                .fetch(FetchRequest {
                    url: url.clone(),
                    headers: vec![
                        ("User-Agent".to_owned(), self.config.user_agent.clone()),
                        (
                            "Accept-Language".to_owned(),
                            self.config.accept_language.clone(),
                        ),
                    ],
                    timeout: self.config.timeout,
                })
                .await?;

            if !response.is_success() {
                return Err(ProbeError::UnexpectedStatus {
                    status: response.status,
                    url,
                });
            }

            let state = self.extractor.extract(&response.body, &url)?;
            if let Some(index) = find_rank_in_state(&state, target_id, &self.config.list_prefix) {
                let index = u32::try_from(index).unwrap_or(u32::MAX);
                let rank = (page - 1)
                    .saturating_mul(self.config.results_per_page)
                    .saturating_add(index)
                    .saturating_add(1);
                tracing::debug!(keyword, target_id, rank, page, "target found");
                return Ok(ProbeOutcome::Found { rank, page });
            }

            let count = result_count(&state, &self.config.list_prefix);
            tracing::debug!(keyword, target_id, page, results = count, "target not on page");
            if count == 0 {
                break;
            }
        }
        Ok(ProbeOutcome::NotFound)
    }

    /// [`Self::locate`] with failures folded into the report.
    pub async fn probe(&self, keyword: &str, target_id: &str, max_pages: u32) -> ProbeReport {
        let result = self.locate(keyword, target_id, max_pages).await;
        if let Err(err) = &result {
            tracing::warn!(keyword, target_id, error = %err, "probe failed");
        }
        ProbeReport::from(result)
    }
}

#[cfg(test)]
#[path = "probe_test.rs"]
mod tests;
