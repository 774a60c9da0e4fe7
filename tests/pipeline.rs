//! End-to-end pipeline tests against local mock providers.

use std::time::Duration;

use metafind::config::{ProxySettings, ProxySource};
use metafind::engines::{EngineSpec, HtmlExtractor, JsonExtractor, WebEngine};
use metafind::proxy::{ApiProxyProvider, ProxyProvider};
use metafind::{Aggregator, Engine, ProxyPool, SearchQuery};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESULTS_PAGE: &str = r#"
<html><body>
  <div class="hit">
    <a class="title" href="https://www.rust-lang.org/">Rust Programming Language</a>
    <p class="desc">A language empowering everyone.</p>
  </div>
  <div class="hit">
    <a class="title" href="/docs/book">The Book</a>
  </div>
  <div class="hit">
    <p class="desc">No link here.</p>
  </div>
</body></html>
"#;

fn html_spec(name: &str, server: &MockServer) -> EngineSpec {
    EngineSpec::new(
        name,
        format!("{}/search", server.uri()),
        "q",
        HtmlExtractor::new("div.hit", "a.title", "a.title").snippet("p.desc"),
    )
    .count_param("num")
    .timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_html_engine_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(query_param("num", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let engine = WebEngine::new(html_spec("mock", &server));
    let results = engine.search("rust", 10, None).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "Rust Programming Language");
    assert_eq!(results[0].snippet, "A language empowering everyone.");
    assert_eq!(results[1].url, format!("{}/docs/book", server.uri()));
    assert_eq!(results[1].snippet, "");
}

#[tokio::test]
async fn test_http_error_status_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let engine = WebEngine::new(html_spec("limited", &server));
    assert!(engine.search("rust", 10, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_json_engine_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .and(query_param("search", "ferris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "items": [
                { "name": "Ferris", "link": "https://rustacean.net/", "about": "The crab" },
                { "name": "No link" }
            ]}
        })))
        .mount(&server)
        .await;

    let spec = EngineSpec::new(
        "jsonmock",
        format!("{}/api", server.uri()),
        "search",
        JsonExtractor::new("data.items", "name", "link").snippet("about"),
    )
    .accept("application/json");
    let results = WebEngine::new(spec).search("ferris", 5, None).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].url, "https://rustacean.net/");
    assert_eq!(results[0].snippet, "The crab");
}

#[tokio::test]
async fn test_aggregator_with_one_failing_provider() {
    let good = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
        .mount(&good)
        .await;
    let bad = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&bad)
        .await;

    let mut aggregator = Aggregator::new();
    aggregator.add_engine(WebEngine::new(html_spec("broken", &bad)));
    aggregator.add_engine(WebEngine::new(html_spec("working", &good)));

    let results = aggregator.search(&SearchQuery::new("rust")).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.source == "working"));
}

#[tokio::test]
async fn test_aggregator_deadline_with_slow_provider() {
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(RESULTS_PAGE)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&slow)
        .await;
    let fast = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
        .mount(&fast)
        .await;

    let mut aggregator = Aggregator::new();
    aggregator.add_engine(WebEngine::new(html_spec("slow", &slow)));
    aggregator.add_engine(WebEngine::new(html_spec("fast", &fast)));
    aggregator.set_deadline(Some(Duration::from_millis(500)));

    let results = aggregator.search(&SearchQuery::new("rust")).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.source == "fast"));
}

#[tokio::test]
async fn test_api_proxy_provider_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxies"))
        .and(header("authorization", "Bearer key-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            "10.0.0.1:8080",
            { "ip_address": "10.0.0.2", "port": "1080", "protocol": "socks5" }
        ])))
        .mount(&server)
        .await;

    let provider = ApiProxyProvider::new(
        format!("{}/proxies", server.uri()),
        Some("key-123".to_string()),
    );
    let proxies = provider.fetch_proxies().await.unwrap();
    assert_eq!(proxies.len(), 2);
    assert_eq!(proxies[1].host(), "10.0.0.2");
    assert_eq!(proxies[1].port(), 1080);
}

#[tokio::test]
async fn test_pool_load_from_api_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxies"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"["10.0.0.1:8080", "bad"]"#))
        .mount(&server)
        .await;

    let settings = ProxySettings {
        source: Some(ProxySource::Api),
        url: Some(format!("{}/proxies", server.uri())),
        ..Default::default()
    };
    let pool = ProxyPool::load(&settings).await;
    assert_eq!(pool.len(), 1);
    assert_eq!(pool.get().unwrap().to_string(), "http://10.0.0.1:8080");
}

#[tokio::test]
async fn test_pool_load_from_failing_api_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let settings = ProxySettings {
        source: Some(ProxySource::Api),
        url: Some(format!("{}/proxies", server.uri())),
        api_key: Some("wrong".to_string()),
        ..Default::default()
    };
    let pool = ProxyPool::load(&settings).await;
    assert!(pool.is_empty());
    assert!(pool.get().is_none());
}
