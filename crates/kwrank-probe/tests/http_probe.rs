//! Integration tests for `HttpFetcher` and `RankProbe` over real HTTP.
//!
//! Uses `wiremock` to stand up a local search endpoint for each test so no
//! real network traffic is made.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use kwrank_probe::{
    BreakerConfig, CircuitBreaker, FetchRequest, Fetcher, HttpFetcher, ProbeConfig, ProbeError,
    ProbeOutcome, RankProbe, RetryPolicy,
};

const ACCEPT_LANGUAGE: &str = "ko-KR,ko;q=0.9";

/// Matches a header's whole raw value. `matchers::header` splits values on
/// commas, which never matches a quality-weighted language list.
struct RawHeader(&'static str, &'static str);

impl Match for RawHeader {
    fn matches(&self, request: &Request) -> bool {
        request
            .headers
            .get(self.0)
            .and_then(|value| value.to_str().ok())
            == Some(self.1)
    }
}

fn results_html(ids: &[&str]) -> String {
    let mut state = serde_json::Map::new();
    let items: Vec<Value> = ids
        .iter()
        .map(|id| {
            let key = format!("RestaurantListSummary:{id}");
            state.insert(key.clone(), json!({ "id": id, "name": "가게" }));
            json!({ "__ref": key })
        })
        .collect();
    state.insert(
        "ROOT_QUERY".to_owned(),
        json!({ "restaurantList({\"input\":{\"display\":15}})": { "items": items } }),
    );
    format!(
        "<!doctype html><html><head><script>window.__APOLLO_STATE__ = {};</script></head></html>",
        Value::Object(state)
    )
}

fn probe_for(server: &MockServer, timeout: Duration) -> RankProbe<HttpFetcher> {
    let config = ProbeConfig {
        search_url: format!("{}/restaurant/list", server.uri()),
        timeout,
        ..ProbeConfig::default()
    };
    let fetcher = HttpFetcher::new(Duration::from_secs(2)).expect("failed to build HttpFetcher");
    RankProbe::new(fetcher, config).expect("failed to build RankProbe")
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetcher_returns_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(RawHeader("accept-language", ACCEPT_LANGUAGE))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
    let response = fetcher
        .fetch(FetchRequest {
            url: format!("{}/page", server.uri()),
            headers: vec![("Accept-Language".to_owned(), ACCEPT_LANGUAGE.to_owned())],
            timeout: Duration::from_secs(5),
        })
        .await
        .unwrap();
    assert_eq!(response.status, 404);
    assert_eq!(response.body, "missing");
    assert!(!response.is_success());
}

#[tokio::test]
async fn fetcher_maps_slow_response_to_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
    let err = fetcher
        .fetch(FetchRequest {
            url: server.uri(),
            headers: vec![],
            timeout: Duration::from_millis(50),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::Timeout { .. }), "got: {err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn fetcher_maps_refused_connection_to_retryable_error() {
    // Bind then drop a listener so nothing is accepting on its port.
    let uri = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}/", listener.local_addr().unwrap())
    };
    let fetcher = HttpFetcher::new(Duration::from_secs(1)).unwrap();
    let err = fetcher
        .fetch(FetchRequest {
            url: uri,
            headers: vec![],
            timeout: Duration::from_secs(1),
        })
        .await
        .unwrap_err();
    assert!(err.is_retryable(), "got: {err:?}");
}

// ---------------------------------------------------------------------------
// RankProbe over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn probe_finds_rank_on_second_page() {
    let server = MockServer::start().await;
    let first: Vec<String> = (0..15).map(|i| format!("p{i}")).collect();
    let first: Vec<&str> = first.iter().map(String::as_str).collect();

    Mock::given(method("GET"))
        .and(path("/restaurant/list"))
        .and(query_param("query", "서울역 국밥"))
        .and(query_param("start", "1"))
        .and(RawHeader("accept-language", ACCEPT_LANGUAGE))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_html(&first)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/restaurant/list"))
        .and(query_param("start", "16"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(results_html(&["x", "y", "1234"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let probe = probe_for(&server, Duration::from_secs(5));
    let outcome = probe.locate("서울역 국밥", "1234", 2).await.unwrap();
    assert_eq!(outcome, ProbeOutcome::Found { rank: 18, page: 2 });
}

#[tokio::test]
async fn probe_reports_server_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/restaurant/list"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let report = probe_for(&server, Duration::from_secs(5))
        .probe("강남 맛집", "1234", 2)
        .await;
    assert_eq!(report.rank, None);
    assert!(report.error.unwrap().contains("500"));
}

#[tokio::test]
async fn retry_and_breaker_wrap_a_flaky_endpoint() {
    let server = MockServer::start().await;
    // First request is too slow for the probe timeout, later ones succeed.
    Mock::given(method("GET"))
        .and(path("/restaurant/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(results_html(&["1234"]))
                .set_delay(Duration::from_millis(500)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/restaurant/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_html(&["1234"])))
        .mount(&server)
        .await;

    let probe = probe_for(&server, Duration::from_millis(100));
    let breaker = CircuitBreaker::new(BreakerConfig::default());
    let retry = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        jitter: Duration::ZERO,
    };

    let outcome = retry
        .run(|| breaker.call(|| probe.locate("강남 맛집", "1234", 1)))
        .await
        .unwrap();
    assert_eq!(outcome, ProbeOutcome::Found { rank: 1, page: 1 });
    assert_eq!(breaker.snapshot().consecutive_failures, 0);
}
