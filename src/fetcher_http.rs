//! HTTP-based page fetcher using reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};

use crate::fetcher::{HttpMethod, PageFetcher, PageRequest};
use crate::proxy::{build_client, Proxy};
use crate::user_agent::{random_user_agent, ACCEPT_LANGUAGE as LANGUAGE};
use crate::Result;

/// Request timeout applied to every engine request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A page fetcher that uses plain HTTP requests via reqwest.
///
/// A client is built per request because each request may use a
/// different proxy.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    /// Creates a new `HttpFetcher` with the default 15 second timeout.
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &PageRequest, proxy: Option<&Proxy>) -> Result<String> {
        let client = build_client(random_user_agent(), self.timeout, proxy)?;

        let builder = match request.method {
            HttpMethod::Get => client.get(request.url.clone()).query(&request.params),
            HttpMethod::Post => client.post(request.url.clone()).form(&request.params),
        };

        let response = builder
            .header(ACCEPT, request.accept.as_str())
            .header(ACCEPT_LANGUAGE, LANGUAGE)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use wiremock::matchers::{body_string_contains, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_http_fetcher_default_timeout() {
        assert_eq!(HttpFetcher::default().timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_http_fetcher_with_timeout() {
        let fetcher = HttpFetcher::new().with_timeout(Duration::from_secs(3));
        assert_eq!(fetcher.timeout(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_fetch_get_sends_query_and_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "rust lang"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/search", server.uri())).unwrap();
        let request = PageRequest::get(url).with_param("q", "rust lang");
        let body = HttpFetcher::new().fetch(&request, None).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_post_sends_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/html/"))
            .and(body_string_contains("q=rust"))
            .respond_with(ResponseTemplate::new(200).set_body_string("posted"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/html/", server.uri())).unwrap();
        let request = PageRequest::post(url).with_param("q", "rust");
        let body = HttpFetcher::new().fetch(&request, None).await.unwrap();
        assert_eq!(body, "posted");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let result = HttpFetcher::new().fetch(&PageRequest::get(url), None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let fetcher = HttpFetcher::new().with_timeout(Duration::from_millis(200));
        assert!(fetcher.fetch(&PageRequest::get(url), None).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_through_dead_proxy_is_error() {
        let url = Url::parse("http://example.invalid/").unwrap();
        let proxy = Proxy::new("127.0.0.1", 1);
        let result = HttpFetcher::new()
            .with_timeout(Duration::from_secs(2))
            .fetch(&PageRequest::get(url), Some(&proxy))
            .await;
        assert!(result.is_err());
    }
}
