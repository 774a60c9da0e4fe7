//! Page fetcher abstraction for retrieving result pages.

use async_trait::async_trait;
use url::Url;

use crate::proxy::Proxy;
use crate::Result;

/// HTTP method used to query a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    /// Parameters go into the query string.
    #[default]
    Get,
    /// Parameters are sent as a urlencoded form body.
    Post,
}

/// A single request to a search provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Endpoint without the query parameters.
    pub url: Url,
    /// Query or form parameters, in order.
    pub params: Vec<(String, String)>,
    /// Value of the `Accept` header.
    pub accept: String,
}

impl PageRequest {
    /// Creates a GET request for `url`.
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            params: Vec::new(),
            accept: crate::user_agent::ACCEPT_HTML.to_string(),
        }
    }

    /// Creates a POST form request for `url`.
    pub fn post(url: Url) -> Self {
        Self {
            method: HttpMethod::Post,
            ..Self::get(url)
        }
    }

    /// Appends a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Sets the `Accept` header.
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = accept.into();
        self
    }

    /// Returns the URL a GET request would hit, parameters included.
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if self.method == HttpMethod::Get && !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.params.iter());
        }
        url
    }
}

/// Trait for fetching the body of a provider's result page.
///
/// Implementations must apply their own request timeout and route through
/// `proxy` when one is given.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Performs the request and returns the response body.
    async fn fetch(&self, request: &PageRequest, proxy: Option<&Proxy>) -> Result<String>;
}
