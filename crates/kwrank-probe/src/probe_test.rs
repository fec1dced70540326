use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{json, Value};

use super::*;
use crate::fetch::FetchResponse;

/// Serves canned responses keyed by the `start` query parameter and records
/// every request it sees.
#[derive(Default)]
struct PagedFetcher {
    pages: HashMap<u32, FetchResponse>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl PagedFetcher {
    fn with_page(mut self, start: u32, status: u16, body: String) -> Self {
        self.pages.insert(start, FetchResponse { status, body });
        self
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Fetcher for PagedFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ProbeError> {
        let url = Url::parse(&request.url).unwrap();
        let start: u32 = url
            .query_pairs()
            .find(|(k, _)| k == "start")
            .map(|(_, v)| v.parse().unwrap())
            .unwrap();
        self.requests.lock().unwrap().push(request);
        self.pages
            .get(&start)
            .cloned()
            .ok_or_else(|| ProbeError::Timeout {
                url: url.to_string(),
            })
    }
}

fn results_page(ids: &[&str]) -> String {
    let mut state = serde_json::Map::new();
    let items: Vec<Value> = ids
        .iter()
        .map(|id| {
            let key = format!("RestaurantListSummary:{id}");
            state.insert(key.clone(), json!({ "id": id }));
            json!({ "__ref": key })
        })
        .collect();
    state.insert(
        "ROOT_QUERY".to_owned(),
        json!({ "restaurantList({\"input\":{}})": { "items": items } }),
    );
    format!(
        "<html><script>window.__APOLLO_STATE__ = {};</script></html>",
        Value::Object(state)
    )
}

fn filler(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

fn probe(fetcher: PagedFetcher) -> RankProbe<PagedFetcher> {
    RankProbe::new(fetcher, ProbeConfig::default()).unwrap()
}

#[test]
fn page_url_encodes_query_and_start() {
    let p = probe(PagedFetcher::default());
    let url = p.page_url("서울역 국밥", 2);
    let parsed = Url::parse(&url).unwrap();
    let pairs: HashMap<String, String> = parsed.query_pairs().into_owned().collect();
    assert_eq!(pairs["query"], "서울역 국밥");
    assert_eq!(pairs["start"], "16");
    assert!(url.starts_with("https://m.place.naver.com/restaurant/list?"));
}

#[test]
fn invalid_search_url_is_rejected() {
    let config = ProbeConfig {
        search_url: "not a url".to_owned(),
        ..ProbeConfig::default()
    };
    assert!(matches!(
        RankProbe::new(PagedFetcher::default(), config),
        Err(ProbeError::InvalidUrl { .. })
    ));
}

#[tokio::test]
async fn finds_target_on_first_page() {
    let fetcher =
        PagedFetcher::default().with_page(1, 200, results_page(&["111", "222", "1234"]));
    let p = probe(fetcher);
    let outcome = p.locate("서울역 국밥", "1234", 2).await.unwrap();
    assert_eq!(outcome, ProbeOutcome::Found { rank: 3, page: 1 });
    assert_eq!(p.fetcher.request_count(), 1);
}

#[tokio::test]
async fn rank_accounts_for_previous_pages() {
    let first = filler("a", 15);
    let first: Vec<&str> = first.iter().map(String::as_str).collect();
    let fetcher = PagedFetcher::default()
        .with_page(1, 200, results_page(&first))
        .with_page(16, 200, results_page(&["b0", "1234"]));
    let outcome = probe(fetcher).locate("강남 맛집", "1234", 2).await.unwrap();
    assert_eq!(outcome, ProbeOutcome::Found { rank: 17, page: 2 });
}

#[tokio::test]
async fn not_found_after_max_pages() {
    let first = filler("a", 15);
    let first: Vec<&str> = first.iter().map(String::as_str).collect();
    let second = filler("b", 15);
    let second: Vec<&str> = second.iter().map(String::as_str).collect();
    let fetcher = PagedFetcher::default()
        .with_page(1, 200, results_page(&first))
        .with_page(16, 200, results_page(&second));
    let p = probe(fetcher);
    let outcome = p.locate("강남 맛집", "1234", 2).await.unwrap();
    assert_eq!(outcome, ProbeOutcome::NotFound);
    assert_eq!(p.fetcher.request_count(), 2);
}

#[tokio::test]
async fn empty_page_stops_the_walk() {
    let fetcher = PagedFetcher::default().with_page(1, 200, results_page(&[]));
    let p = probe(fetcher);
    let outcome = p.locate("없는 키워드", "1234", 5).await.unwrap();
    assert_eq!(outcome, ProbeOutcome::NotFound);
    assert_eq!(p.fetcher.request_count(), 1);
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let fetcher = PagedFetcher::default().with_page(1, 503, String::new());
    let err = probe(fetcher).locate("강남 맛집", "1234", 2).await.unwrap_err();
    assert!(matches!(err, ProbeError::UnexpectedStatus { status: 503, .. }));
}

#[tokio::test]
async fn page_without_state_is_an_error() {
    let fetcher =
        PagedFetcher::default().with_page(1, 200, "<html>captcha</html>".to_owned());
    let err = probe(fetcher).locate("강남 맛집", "1234", 2).await.unwrap_err();
    assert!(matches!(err, ProbeError::StateMarkerMissing { .. }));
}

#[tokio::test]
async fn sends_configured_headers_and_timeout() {
    let fetcher = PagedFetcher::default().with_page(1, 200, results_page(&["1234"]));
    let p = probe(fetcher);
    p.locate("강남 맛집", "1234", 1).await.unwrap();
    let requests = p.fetcher.requests.lock().unwrap();
    let headers: HashMap<&str, &str> = requests[0]
        .headers
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    assert!(headers["User-Agent"].contains("iPhone"));
    assert_eq!(headers["Accept-Language"], "ko-KR,ko;q=0.9");
    assert_eq!(requests[0].timeout, Duration::from_millis(10_000));
}

#[tokio::test]
async fn probe_folds_errors_into_report() {
    // No page registered: the stub reports a timeout.
    let report = probe(PagedFetcher::default())
        .probe("강남 맛집", "1234", 1)
        .await;
    assert_eq!(report.rank, None);
    assert!(report.error.as_deref().unwrap().contains("timed out"));
    assert!(!report.is_not_found());
}

#[tokio::test]
async fn probe_reports_found_and_not_found() {
    let fetcher = PagedFetcher::default().with_page(1, 200, results_page(&["9", "1234"]));
    let p = probe(fetcher);
    let found = p.probe("강남 맛집", "1234", 1).await;
    assert_eq!((found.rank, found.page), (Some(2), Some(1)));

    let missing = p.probe("강남 맛집", "5555", 1).await;
    assert!(missing.is_not_found());
}

#[test]
fn outcome_serializes_with_status_tag() {
    let json = serde_json::to_value(ProbeOutcome::Found { rank: 3, page: 1 }).unwrap();
    assert_eq!(json, json!({ "status": "found", "rank": 3, "page": 1 }));
    let back: ProbeOutcome = serde_json::from_value(json!({ "status": "not_found" })).unwrap();
    assert_eq!(back, ProbeOutcome::NotFound);
}
