//! Generic templated-request engine.
//!
//! Every built-in provider is a [`WebEngine`] configured by an
//! [`EngineSpec`]: where to send the request, how to name the parameters,
//! and which [`Extractor`] reads the response.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info_span, warn, Instrument, Span};
use url::Url;

use super::extract::Extractor;
use crate::fetcher::{HttpMethod, PageFetcher, PageRequest};
use crate::fetcher_http::{HttpFetcher, DEFAULT_REQUEST_TIMEOUT};
use crate::proxy::Proxy;
use crate::{Engine, Result, SearchResult};

/// How query terms and the result count map onto request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamMap {
    /// Parameter carrying the query terms.
    pub query: String,
    /// Parameter carrying the result count, if the provider has one.
    pub count: Option<String>,
    /// Largest count the provider accepts.
    pub count_cap: Option<usize>,
    /// Fixed parameters sent with every request.
    pub extra: Vec<(String, String)>,
}

impl ParamMap {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            count: None,
            count_cap: None,
            extra: Vec::new(),
        }
    }
}

/// Everything that distinguishes one provider from another.
#[derive(Clone)]
pub struct EngineSpec {
    /// Engine name, used as the result `source` tag.
    pub name: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Endpoint URL without per-query parameters.
    pub endpoint: String,
    /// Parameter names.
    pub params: ParamMap,
    /// `Accept` header override.
    pub accept: Option<String>,
    /// Body fragments that mark a bot-check page instead of results.
    pub block_markers: Vec<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Response parser.
    pub extractor: Arc<dyn Extractor>,
}

impl EngineSpec {
    /// Creates a GET spec with the default 15 second timeout.
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        query_param: impl Into<String>,
        extractor: impl Extractor + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            method: HttpMethod::Get,
            endpoint: endpoint.into(),
            params: ParamMap::new(query_param),
            accept: None,
            block_markers: Vec::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            extractor: Arc::new(extractor),
        }
    }

    /// Sends parameters as a POST form.
    pub fn post(mut self) -> Self {
        self.method = HttpMethod::Post;
        self
    }

    /// Sets the result count parameter name.
    pub fn count_param(mut self, name: impl Into<String>) -> Self {
        self.params.count = Some(name.into());
        self
    }

    /// Caps the count sent to the provider.
    pub fn count_cap(mut self, cap: usize) -> Self {
        self.params.count_cap = Some(cap);
        self
    }

    /// Adds a fixed parameter.
    pub fn extra_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.extra.push((name.into(), value.into()));
        self
    }

    /// Overrides the `Accept` header.
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Adds a bot-check marker.
    pub fn block_marker(mut self, marker: impl Into<String>) -> Self {
        self.block_markers.push(marker.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the request for one query.
    pub fn request(&self, query: &str, num_results: usize) -> Result<PageRequest> {
        let url = Url::parse(&self.endpoint)?;
        let mut request = match self.method {
            HttpMethod::Get => PageRequest::get(url),
            HttpMethod::Post => PageRequest::post(url),
        }
        .with_param(&self.params.query, query);

        if let Some(count) = &self.params.count {
            let n = match self.params.count_cap {
                Some(cap) => num_results.min(cap),
                None => num_results,
            };
            request = request.with_param(count, n.max(1).to_string());
        }
        for (name, value) in &self.params.extra {
            request = request.with_param(name, value);
        }
        if let Some(accept) = &self.accept {
            request = request.with_accept(accept);
        }
        Ok(request)
    }
}

impl fmt::Debug for EngineSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSpec")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("endpoint", &self.endpoint)
            .field("params", &self.params)
            .field("timeout", &self.timeout)
            .field("extractor", &self.extractor)
            .finish()
    }
}

/// A search engine driven entirely by its [`EngineSpec`].
///
/// Network, status and parse failures are logged and reduced to an empty
/// result list; `search` never returns `Err`.
pub struct WebEngine {
    spec: EngineSpec,
    fetcher: Arc<dyn PageFetcher>,
    span: Span,
}

impl WebEngine {
    /// Creates an engine that fetches over HTTP with the spec's timeout.
    pub fn new(spec: EngineSpec) -> Self {
        let fetcher = Arc::new(HttpFetcher::new().with_timeout(spec.timeout));
        Self::with_fetcher(spec, fetcher)
    }

    /// Creates an engine using a custom fetcher.
    pub fn with_fetcher(spec: EngineSpec, fetcher: Arc<dyn PageFetcher>) -> Self {
        let span = info_span!("engine", name = %spec.name);
        Self { spec, fetcher, span }
    }

    pub fn spec(&self) -> &EngineSpec {
        &self.spec
    }

    async fn try_search(
        &self,
        query: &str,
        num_results: usize,
        proxy: Option<&Proxy>,
    ) -> Result<Vec<SearchResult>> {
        let request = self.spec.request(query, num_results)?;
        debug!(url = %request.full_url(), proxy = ?proxy.map(|p| p.to_string()), "Sending request");

        let body = self.fetcher.fetch(&request, proxy).await?;

        if let Some(marker) = self.spec.block_markers.iter().find(|m| body.contains(m.as_str())) {
            warn!(%marker, "Provider returned a bot-check page");
            return Ok(Vec::new());
        }

        let mut results = self.spec.extractor.extract(&body, &request.url)?;
        results.truncate(num_results);
        Ok(results)
    }
}

#[async_trait]
impl Engine for WebEngine {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn timeout(&self) -> Duration {
        self.spec.timeout
    }

    async fn search(
        &self,
        query: &str,
        num_results: usize,
        proxy: Option<&Proxy>,
    ) -> Result<Vec<SearchResult>> {
        async {
            match self.try_search(query, num_results, proxy).await {
                Ok(results) => {
                    debug!(count = results.len(), "Engine returned results");
                    Ok(results)
                }
                Err(e) => {
                    error!(error = %e, "Engine request failed");
                    Ok(Vec::new())
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }
}
