//! Integration tests for `Fetcher` and `Session` against a local
//! `wiremock` server. No real network traffic is made.

use std::sync::Arc;
use std::time::Duration;

use sizewatch_core::{MemoryProxyStore, ProxyEndpoint};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sizewatch_scraper::{
    FetchConfig, FetchError, Fetcher, PoolSettings, ProxyMode, ProxyPool, ScrapeError, Session,
};

/// Three attempts, no pause between them.
fn fast_config() -> FetchConfig {
    FetchConfig {
        timeout: Duration::from_secs(2),
        max_attempts: 3,
        retry_min_delay: Duration::ZERO,
        retry_max_delay: Duration::ZERO,
        user_agents: Some(vec!["sizewatch-test/1.0".to_owned()]),
    }
}

fn fetcher() -> Fetcher {
    Fetcher::new(fast_config()).expect("failed to build test Fetcher")
}

fn session(store: Arc<MemoryProxyStore>, mode: ProxyMode) -> Session {
    let pool = ProxyPool::new(store, PoolSettings { max_fails: 5, mode });
    Session::new(Arc::new(fetcher()), pool)
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn server_errors_are_retried_up_to_the_attempt_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let outcome = fetcher()
        .fetch(&format!("{}/p/1", server.uri()), &[], &[])
        .await;

    assert!(
        matches!(outcome.result, Err(FetchError::UnexpectedStatus { status: 500, .. })),
        "expected UnexpectedStatus(500), got: {:?}",
        outcome.result
    );
    assert!(outcome.proxy_failures.is_empty());
}

#[tokio::test]
async fn not_found_fails_without_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = fetcher()
        .fetch(&format!("{}/gone", server.uri()), &[], &[])
        .await;

    assert!(matches!(outcome.result, Err(FetchError::NotFound { .. })));
}

#[tokio::test]
async fn transient_failure_then_success_returns_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let page = fetcher()
        .fetch(&format!("{}/flaky", server.uri()), &[], &[])
        .await
        .result
        .expect("second attempt should succeed");

    assert_eq!(page.status, 200);
    assert_eq!(page.body, "<html>ok</html>");
}

#[tokio::test]
async fn slow_responses_time_out_and_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(2)
        .mount(&server)
        .await;

    let config = FetchConfig {
        timeout: Duration::from_millis(200),
        max_attempts: 2,
        ..fast_config()
    };
    let outcome = Fetcher::new(config)
        .expect("failed to build test Fetcher")
        .fetch(&format!("{}/slow", server.uri()), &[], &[])
        .await;

    assert!(matches!(outcome.result, Err(FetchError::Transport { proxy: None, .. })));
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn user_agent_is_drawn_from_the_pool_when_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "sizewatch-test/1.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = fetcher().fetch(&server.uri(), &[], &[]).await;
    assert!(outcome.result.is_ok(), "got: {:?}", outcome.result);
}

#[tokio::test]
async fn caller_user_agent_wins_over_the_pool() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "fixed/2.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let headers = vec![("User-Agent".to_owned(), "fixed/2.0".to_owned())];
    let outcome = fetcher().fetch(&server.uri(), &headers, &[]).await;
    assert!(outcome.result.is_ok(), "got: {:?}", outcome.result);
}

#[tokio::test]
async fn session_sends_browser_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("dnt", "1"))
        .and(header("upgrade-insecure-requests", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryProxyStore::default());
    let page = session(store, ProxyMode::Preferred)
        .get(&server.uri(), &[])
        .await
        .expect("direct fetch should succeed with an empty pool");
    assert_eq!(page.body, "ok");
}

// ---------------------------------------------------------------------------
// Proxy handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn required_mode_with_no_proxies_never_sends_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryProxyStore::default());
    let err = session(store, ProxyMode::Required)
        .get(&server.uri(), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::PoolExhausted { max_fails: 5 }));
    assert!(err.is_session_fatal());
}

#[tokio::test]
async fn unreachable_proxy_is_charged_once_per_failed_attempt() {
    let server = MockServer::start().await;
    // Port 1 on loopback refuses connections.
    let store = Arc::new(MemoryProxyStore::new(vec![ProxyEndpoint::new("127.0.0.1", 1)]));

    let err = session(Arc::clone(&store), ProxyMode::Preferred)
        .get(&format!("{}/p", server.uri()), &[])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScrapeError::Fetch(FetchError::Transport { proxy: Some(_), .. })
    ));
    assert_eq!(store.fail_count("127.0.0.1", 1), Some(3));
}

#[tokio::test]
async fn begin_resets_failure_counters() {
    let mut endpoint = ProxyEndpoint::new("10.0.0.9", 8080);
    endpoint.fail_count = 9;
    let store = Arc::new(MemoryProxyStore::new(vec![endpoint]));

    session(Arc::clone(&store), ProxyMode::Required)
        .begin()
        .await
        .expect("reset should succeed");

    assert_eq!(store.fail_count("10.0.0.9", 8080), Some(0));
}
