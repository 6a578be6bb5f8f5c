//! Tests for the fetch engine

use super::*;
use crate::cache::MemoryCache;
use crate::http::{HttpClientConfig, HttpExecutor};
use crate::retry::RecordingSleeper;
use crate::types::HeaderMapping;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    cache: Arc<MemoryCache>,
    sleeper: Arc<RecordingSleeper>,
    fetcher: Fetcher,
}

impl Harness {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let cache = Arc::new(MemoryCache::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        let fetcher = Fetcher::new(executor(), cache.clone()).with_sleeper(sleeper.clone());
        Self {
            server,
            cache,
            sleeper,
            fetcher,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    fn link_next(&self, path: &str) -> String {
        format!("<{}>; rel=\"next\"", self.url(path))
    }
}

fn executor() -> HttpExecutor {
    HttpExecutor::with_config(HttpClientConfig::default()).unwrap()
}

fn ctx() -> FetchContext {
    FetchContext::new("cockroachdb/cockroach").with_token("t0k3n")
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    login: String,
    id: u64,
}

// ============================================================================
// Cache Consultation
// ============================================================================

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() {
    let h = Harness::new().await;

    Mock::given(method("GET"))
        .and(path("/users/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "alice", "id": 7})))
        .expect(1)
        .mount(&h.server)
        .await;

    let url = h.url("/users/alice");
    let first: FetchedPage<User> = h.fetcher.fetch(&ctx(), &url, false).await.unwrap();
    let second: FetchedPage<User> = h.fetcher.fetch(&ctx(), &url, false).await.unwrap();

    assert_eq!(first.source, PageSource::Network);
    assert_eq!(second.source, PageSource::Cache);
    assert_eq!(first.value, second.value);
    assert_eq!(
        second.value,
        Some(User {
            login: "alice".to_string(),
            id: 7
        })
    );
    assert_eq!(h.cache.len(), 1);
}

#[tokio::test]
async fn test_cached_page_with_next_is_not_revalidated() {
    let h = Harness::new().await;
    let url = h.url("/repos/a/b/stargazers");

    let mut headers = HeaderMapping::new();
    headers.insert("link".to_string(), h.link_next("/repos/a/b/stargazers?page=2"));
    h.cache
        .put(
            &RequestIdentity::get(&ctx(), &url),
            &CacheEntry::new(200, headers, "[1, 2]"),
        )
        .await
        .unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[9]"))
        .expect(0)
        .mount(&h.server)
        .await;

    let page: FetchedPage<Vec<u32>> = h.fetcher.fetch(&ctx(), &url, true).await.unwrap();
    assert_eq!(page.value, Some(vec![1, 2]));
    assert_eq!(page.next, Some(h.url("/repos/a/b/stargazers?page=2")));
    assert!(page.is_cached());
}

#[tokio::test]
async fn test_cached_last_page_is_revalidated_when_asked() {
    let h = Harness::new().await;
    let url = h.url("/repos/a/b/stargazers");
    let identity = RequestIdentity::get(&ctx(), &url);

    h.cache
        .put(&identity, &CacheEntry::new(200, HeaderMapping::new(), "[1]"))
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/repos/a/b/stargazers"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1, 2]"))
        .expect(1)
        .mount(&h.server)
        .await;

    let page: FetchedPage<Vec<u32>> = h.fetcher.fetch(&ctx(), &url, true).await.unwrap();
    assert_eq!(page.value, Some(vec![1, 2]));
    assert_eq!(page.source, PageSource::Network);

    // The refreshed page replaced the stale one.
    let stored = h.cache.get(&identity).await.unwrap().unwrap();
    assert_eq!(stored.body, "[1, 2]");
}

#[tokio::test]
async fn test_cached_last_page_is_kept_without_revalidation() {
    let h = Harness::new().await;
    let url = h.url("/users/alice/followers");
    h.cache
        .put(
            &RequestIdentity::get(&ctx(), &url),
            &CacheEntry::new(200, HeaderMapping::new(), "[]"),
        )
        .await
        .unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1]"))
        .expect(0)
        .mount(&h.server)
        .await;

    let page: FetchedPage<Vec<u32>> = h.fetcher.fetch(&ctx(), &url, false).await.unwrap();
    assert_eq!(page.value, Some(vec![]));
    assert!(page.is_cached());
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_paged_collection_equals_unpaged_collection() {
    let h = Harness::new().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", h.link_next("/items?page=2").as_str())
                .set_body_json(json!([1, 2, 3])),
        )
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", h.link_next("/items?page=3").as_str())
                .set_body_json(json!([4, 5])),
        )
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([6])))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/all-items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3, 4, 5, 6])))
        .mount(&h.server)
        .await;

    let paged: Vec<u32> = h
        .fetcher
        .fetch_all(&ctx(), &h.url("/items"), true)
        .await
        .unwrap();
    let unpaged: FetchedPage<Vec<u32>> = h
        .fetcher
        .fetch(&ctx(), &h.url("/all-items"), false)
        .await
        .unwrap();

    assert_eq!(Some(paged), unpaged.value);
}

#[tokio::test]
async fn test_cursor_loop_driven_by_caller() {
    let h = Harness::new().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "Link",
                    format!(
                        "<{}>; rel=\"next\", <{}>; rel=\"last\"",
                        h.url("/items?page=2"),
                        h.url("/items?page=2")
                    )
                    .as_str(),
                )
                .set_body_json(json!(["a"])),
        )
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["b"])))
        .mount(&h.server)
        .await;

    let mut collected: Vec<String> = Vec::new();
    let mut cursor = Some(h.url("/items"));
    while let Some(url) = cursor {
        let (value, next) = h
            .fetcher
            .fetch::<Vec<String>>(&ctx(), &url, false)
            .await
            .unwrap()
            .into_parts();
        collected.extend(value.unwrap_or_default());
        cursor = next;
    }

    assert_eq!(collected, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_fetch_all_capped_stops_requesting_pages() {
    let h = Harness::new().await;

    Mock::given(method("GET"))
        .and(path("/starred"))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", h.link_next("/starred?page=2").as_str())
                .set_body_json(json!([1, 2, 3])),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/starred"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([4])))
        .expect(0)
        .mount(&h.server)
        .await;

    let items: Vec<u32> = h
        .fetcher
        .fetch_all_capped(&ctx(), &h.url("/starred"), false, 3)
        .await
        .unwrap();
    assert_eq!(items, vec![1, 2, 3]);
}

// ============================================================================
// Retry Policy
// ============================================================================

#[tokio::test]
async fn test_transient_failures_back_off_then_soft_fail() {
    let h = Harness::new().await;

    Mock::given(method("GET"))
        .and(path("/repos/a/b/stats/contributors"))
        .respond_with(ResponseTemplate::new(202))
        .expect(10)
        .mount(&h.server)
        .await;

    let page: FetchedPage<Vec<serde_json::Value>> = h
        .fetcher
        .fetch(&ctx(), &h.url("/repos/a/b/stats/contributors"), false)
        .await
        .unwrap();

    assert_eq!(page, FetchedPage::unavailable());
    assert_eq!(
        h.sleeper.waits(),
        vec![
            ms(50),
            ms(100),
            ms(200),
            ms(400),
            ms(800),
            ms(1000),
            ms(1000),
            ms(1000),
            ms(1000)
        ]
    );
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_transient_then_success() {
    let h = Harness::new().await;

    Mock::given(method("GET"))
        .and(path("/repos/a/b/stats/contributors"))
        .respond_with(ResponseTemplate::new(202))
        .up_to_n_times(2)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/a/b/stats/contributors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"total": 3}])))
        .mount(&h.server)
        .await;

    let page: FetchedPage<Vec<serde_json::Value>> = h
        .fetcher
        .fetch(&ctx(), &h.url("/repos/a/b/stats/contributors"), false)
        .await
        .unwrap();

    assert_eq!(page.value, Some(vec![json!({"total": 3})]));
    assert_eq!(h.sleeper.waits(), vec![ms(50), ms(100)]);
}

#[tokio::test]
async fn test_connection_failures_soft_fail() {
    let cache = Arc::new(MemoryCache::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let fetcher = Fetcher::new(executor(), cache.clone())
        .with_sleeper(sleeper.clone())
        .with_policy(BackoffPolicy {
            max_attempts: 3,
            ..BackoffPolicy::default()
        });

    // Nothing listens on port 1.
    let page: FetchedPage<serde_json::Value> = fetcher
        .fetch(&ctx(), "http://127.0.0.1:1/users/alice", false)
        .await
        .unwrap();

    assert!(!page.is_available());
    assert_eq!(page.next, None);
    assert_eq!(sleeper.waits(), vec![ms(50), ms(100)]);
}

#[tokio::test]
async fn test_rate_limit_waits_until_reset_plus_padding() {
    let h = Harness::new().await;
    let reset = Utc::now().timestamp() + 30;

    Mock::given(method("GET"))
        .and(path("/users/alice"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("X-RateLimit-Remaining", "0")
                .insert_header("X-RateLimit-Reset", reset.to_string().as_str()),
        )
        .up_to_n_times(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "alice", "id": 1})))
        .mount(&h.server)
        .await;

    let page: FetchedPage<User> = h
        .fetcher
        .fetch(&ctx(), &h.url("/users/alice"), false)
        .await
        .unwrap();
    assert_eq!(page.value.unwrap().login, "alice");

    let waits = h.sleeper.waits();
    assert_eq!(waits.len(), 1);
    assert!(waits[0] > Duration::from_secs(29), "waited {:?}", waits[0]);
    assert!(waits[0] <= Duration::from_secs(31), "waited {:?}", waits[0]);
}

#[tokio::test]
async fn test_rate_limit_real_wait_is_not_cut_short() {
    let server = MockServer::start().await;
    let reset = Utc::now().timestamp();

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("X-RateLimit-Remaining", "0")
                .insert_header("X-RateLimit-Reset", reset.to_string().as_str()),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(executor(), Arc::new(MemoryCache::new()));
    let page: FetchedPage<serde_json::Value> = fetcher
        .fetch(&ctx(), &format!("{}/rate_limit", server.uri()), false)
        .await
        .unwrap();

    assert!(page.is_available());
    let resume_at = chrono::DateTime::<Utc>::from_timestamp(reset + 1, 0).unwrap();
    assert!(Utc::now() >= resume_at);
}

#[tokio::test]
async fn test_permanent_failure_soft_fails_without_retry() {
    let h = Harness::new().await;

    Mock::given(method("GET"))
        .and(path("/repos/gone/away"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .expect(1)
        .mount(&h.server)
        .await;

    let page: FetchedPage<serde_json::Value> = h
        .fetcher
        .fetch(&ctx(), &h.url("/repos/gone/away"), false)
        .await
        .unwrap();

    assert_eq!(page, FetchedPage::unavailable());
    assert!(h.sleeper.waits().is_empty());
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_forbidden_without_quota_headers_is_permanent() {
    let h = Harness::new().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&h.server)
        .await;

    let page: FetchedPage<serde_json::Value> = h
        .fetcher
        .fetch(&ctx(), &h.url("/repos/private/repo"), false)
        .await
        .unwrap();
    assert!(!page.is_available());
}

// ============================================================================
// Corruption Recovery
// ============================================================================

#[tokio::test]
async fn test_corrupt_cached_body_is_refetched_once() {
    let h = Harness::new().await;
    let url = h.url("/users/alice");
    let identity = RequestIdentity::get(&ctx(), &url);
    h.cache
        .put(&identity, &CacheEntry::new(200, HeaderMapping::new(), "{\"login\": tru"))
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/users/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "alice", "id": 3})))
        .expect(1)
        .mount(&h.server)
        .await;

    let page: FetchedPage<User> = h.fetcher.fetch(&ctx(), &url, false).await.unwrap();
    assert_eq!(page.value.unwrap().id, 3);
    assert_eq!(page.source, PageSource::Network);

    let stored = h.cache.get(&identity).await.unwrap().unwrap();
    assert!(stored.body.contains("alice"));
}

#[tokio::test]
async fn test_second_decode_failure_is_an_error() {
    let h = Harness::new().await;

    Mock::given(method("GET"))
        .and(path("/users/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(2)
        .mount(&h.server)
        .await;

    let err = h
        .fetcher
        .fetch::<User>(&ctx(), &h.url("/users/alice"), false)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
    assert!(err.to_string().contains("/users/alice"));
    // The bad body is not left behind.
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_shape_mismatch_counts_as_decode_failure() {
    let h = Harness::new().await;
    let url = h.url("/users/alice");
    h.cache
        .put(
            &RequestIdentity::get(&ctx(), &url),
            &CacheEntry::new(200, HeaderMapping::new(), "[1, 2]"),
        )
        .await
        .unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[3]"))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h
        .fetcher
        .fetch::<User>(&ctx(), &url, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

// ============================================================================
// Cache Failures
// ============================================================================

struct BrokenCache {
    fail_reads: bool,
}

#[async_trait]
impl ResponseCache for BrokenCache {
    async fn get(&self, _identity: &RequestIdentity) -> Result<Option<CacheEntry>> {
        if self.fail_reads {
            return Err(Error::cache_io(
                "read",
                "/broken",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            ));
        }
        Ok(None)
    }

    async fn put(&self, _identity: &RequestIdentity, _entry: &CacheEntry) -> Result<()> {
        Err(Error::cache_io(
            "write",
            "/broken",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        ))
    }

    async fn invalidate(&self, _identity: &RequestIdentity) -> Result<()> {
        Ok(())
    }

    async fn clear_scope(&self, _scope: &str) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_cache_write_failure_degrades_to_uncached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "bob", "id": 2})))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(executor(), Arc::new(BrokenCache { fail_reads: false }));
    let url = format!("{}/users/bob", server.uri());

    for _ in 0..2 {
        let page: FetchedPage<User> = fetcher.fetch(&ctx(), &url, false).await.unwrap();
        assert_eq!(page.value.unwrap().login, "bob");
        assert_eq!(page.source, PageSource::Network);
    }
}

#[tokio::test]
async fn test_cache_read_failure_is_hard() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(executor(), Arc::new(BrokenCache { fail_reads: true }));
    let err = fetcher
        .fetch::<serde_json::Value>(&ctx(), &format!("{}/users/bob", server.uri()), false)
        .await
        .unwrap_err();
    assert!(err.is_cache_failure());
}

// ============================================================================
// Misc
// ============================================================================

#[tokio::test]
async fn test_invalid_url_is_rejected_before_any_request() {
    let h = Harness::new().await;
    let err = h
        .fetcher
        .fetch::<serde_json::Value>(&ctx(), "not a url", false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidUrl { .. }));
}

#[tokio::test]
async fn test_clear_scope_delegates_to_cache() {
    let h = Harness::new().await;
    let ours = RequestIdentity::get(&ctx(), "https://api.github.com/users/a");
    let theirs = RequestIdentity::get(&FetchContext::new("x/y"), "https://api.github.com/users/a");
    let entry = CacheEntry::new(200, HeaderMapping::new(), "{}");
    h.cache.put(&ours, &entry).await.unwrap();
    h.cache.put(&theirs, &entry).await.unwrap();

    h.fetcher.clear_scope("cockroachdb/cockroach").await.unwrap();

    assert_eq!(h.cache.len(), 1);
    assert!(h.cache.get(&theirs).await.unwrap().is_some());
}

#[test]
fn test_from_config_uses_configured_policy() {
    let dir = tempfile::tempdir().unwrap();
    let config = FetchConfig::builder()
        .cache_dir(dir.path())
        .max_attempts(4)
        .build()
        .unwrap();
    let fetcher = Fetcher::from_config(&config).unwrap();
    assert_eq!(fetcher.policy().max_attempts, 4);
}
